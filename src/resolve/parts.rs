//! Loading full part records for resolved vehicles.

use tracing::{debug, warn};

use crate::core::{BrandScope, CatalogError, FitmentError, Part, PartCatalog, PartsConfig};

/// Fetches parts from the catalog in batches and returns them brand-filtered,
/// de-duplicated and ordered by part id.
///
/// With the `parallel` feature, batches run on a bounded thread pool owned by
/// the resolver; the first failing batch aborts the join.
pub struct PartResolver {
    batch_size: usize,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl PartResolver {
    pub fn new(config: &PartsConfig) -> Result<Self, FitmentError> {
        if config.batch_size == 0 {
            return Err(FitmentError::WorkerPool("batch size must be positive".into()));
        }
        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_concurrency.max(1))
            .thread_name(|i| format!("fitment-parts-{i}"))
            .build()
            .map_err(|e| FitmentError::WorkerPool(e.to_string()))?;

        Ok(Self {
            batch_size: config.batch_size,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// Resolve part ids into parts visible to `scope`.
    pub fn resolve<C: PartCatalog + ?Sized>(
        &self,
        catalog: &C,
        ids: &[i64],
        scope: &BrandScope,
    ) -> Result<Vec<Part>, FitmentError> {
        if ids.is_empty() || scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let batches: Vec<&[i64]> = ids.chunks(self.batch_size).collect();
        debug!(parts = ids.len(), batches = batches.len(), "fetching parts");
        let fetched = self.fetch_batches(catalog, &batches, scope)?;

        let mut parts: Vec<Part> = Vec::with_capacity(ids.len());
        for part in fetched.into_iter().flatten() {
            if !scope.contains(part.brand_id) {
                warn!(
                    part_id = part.id,
                    brand_id = part.brand_id,
                    "catalog returned a part outside the brand scope, dropping"
                );
                continue;
            }
            parts.push(part);
        }
        parts.sort_by_key(|p| p.id);
        parts.dedup_by_key(|p| p.id);
        Ok(parts)
    }

    #[cfg(feature = "parallel")]
    fn fetch_batches<C: PartCatalog + ?Sized>(
        &self,
        catalog: &C,
        batches: &[&[i64]],
        scope: &BrandScope,
    ) -> Result<Vec<Vec<Part>>, FitmentError> {
        use rayon::prelude::*;

        self.pool
            .install(|| {
                batches
                    .par_iter()
                    .map(|batch| catalog.fetch_parts(batch, scope))
                    .collect::<Result<Vec<_>, CatalogError>>()
            })
            .map_err(FitmentError::from)
    }

    #[cfg(not(feature = "parallel"))]
    fn fetch_batches<C: PartCatalog + ?Sized>(
        &self,
        catalog: &C,
        batches: &[&[i64]],
        scope: &BrandScope,
    ) -> Result<Vec<Vec<Part>>, FitmentError> {
        batches
            .iter()
            .map(|batch| catalog.fetch_parts(batch, scope))
            .collect::<Result<Vec<_>, CatalogError>>()
            .map_err(FitmentError::from)
    }
}
