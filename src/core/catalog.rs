//! Parts catalog seam.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::CatalogError;
use super::types::{BrandScope, Part};

/// Returns full part records for part identifiers.
pub trait PartCatalog: Send + Sync {
    /// Fetch the parts with the given ids that belong to a brand in `scope`.
    /// Unknown ids are skipped.
    fn fetch_parts(&self, ids: &[i64], scope: &BrandScope) -> Result<Vec<Part>, CatalogError>;
}

impl<T: PartCatalog + ?Sized> PartCatalog for Arc<T> {
    fn fetch_parts(&self, ids: &[i64], scope: &BrandScope) -> Result<Vec<Part>, CatalogError> {
        (**self).fetch_parts(ids, scope)
    }
}

/// Catalog held in memory, keyed by part id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    parts: HashMap<i64, Part>,
}

impl InMemoryCatalog {
    pub fn new(parts: impl IntoIterator<Item = Part>) -> Self {
        Self {
            parts: parts.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn insert(&mut self, part: Part) {
        self.parts.insert(part.id, part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl PartCatalog for InMemoryCatalog {
    fn fetch_parts(&self, ids: &[i64], scope: &BrandScope) -> Result<Vec<Part>, CatalogError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.parts.get(id))
            .filter(|p| scope.contains(p.brand_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: i64, brand_id: i64) -> Part {
        Part {
            id,
            brand_id,
            status: 800,
            short_description: None,
        }
    }

    #[test]
    fn fetch_skips_unknown_and_out_of_scope() {
        let catalog = InMemoryCatalog::new([part(1, 1), part(2, 3), part(3, 1)]);
        let parts = catalog.fetch_parts(&[3, 2, 99, 1], &BrandScope::new([1])).unwrap();
        let ids: Vec<i64> = parts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
