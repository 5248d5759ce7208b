use std::sync::Arc;

use tracing::{debug, info};

use super::cascade::{self, CascadeOptions, CascadeResolver, CascadeStep};
use super::crossref::{CrossReference, CrossReferenceCache};
use super::matcher::{ConfigurationMatcher, union_configuration};
use super::parts::PartResolver;
use crate::core::{
    BrandScope, CascadeQuery, Dimension, FitmentError, FitmentLookup, FitmentStore,
    InternalVehicle, LookupStatus, PartCatalog, PartsConfig, Stage, VinDecoder, normalize_vin,
};

/// Composes the resolution stages behind the three lookup paths.
///
/// ```no_run
/// # use fitment::core::*;
/// # use fitment::resolve::FitmentEngine;
/// # fn demo<S: FitmentStore, C: PartCatalog, D: VinDecoder>(store: S, catalog: C, decoder: D)
/// # -> Result<(), FitmentError> {
/// let engine = FitmentEngine::new(store, catalog, decoder, &PartsConfig::default())?;
/// let scope = BrandScope::new([1]);
///
/// let makes = engine.cascade(&CascadeQuery::new().year("2010"), &scope)?;
/// println!("{:?}", makes.available_makes);
///
/// let by_vin = engine.lookup_vin("3FAHP0HA6AR123456", &scope)?;
/// println!("{} parts", by_vin.parts.len());
/// # Ok(())
/// # }
/// ```
pub struct FitmentEngine<S, C, D> {
    store: S,
    catalog: C,
    decoder: D,
    cross_reference: CrossReferenceCache,
    parts: PartResolver,
}

impl<S, C, D> FitmentEngine<S, C, D>
where
    S: FitmentStore,
    C: PartCatalog,
    D: VinDecoder,
{
    pub fn new(store: S, catalog: C, decoder: D, parts: &PartsConfig) -> Result<Self, FitmentError> {
        Ok(Self {
            store,
            catalog,
            decoder,
            cross_reference: CrossReferenceCache::new(),
            parts: PartResolver::new(parts)?,
        })
    }

    /// Cascade lookup: next options, or parts once the style is supplied.
    pub fn cascade(
        &self,
        query: &CascadeQuery,
        scope: &BrandScope,
    ) -> Result<FitmentLookup, FitmentError> {
        check_scope(scope)?;
        let step = cascade::plan(query)?;
        let resolver = CascadeResolver::new(&self.store);

        let mut lookup = match step {
            CascadeStep::Options(dimension, filter) => {
                let mut lookup =
                    FitmentLookup::new(LookupStatus::Options(dimension), scope.clone());
                match resolver.options(dimension, &filter, scope)? {
                    CascadeOptions::Years(years) => lookup.available_years = years,
                    CascadeOptions::Names(Dimension::Make, names) => lookup.available_makes = names,
                    CascadeOptions::Names(Dimension::Model, names) => {
                        lookup.available_models = names
                    }
                    CascadeOptions::Names(_, names) => lookup.available_styles = names,
                }
                lookup
            }
            CascadeStep::Terminal(filter) => {
                let ids = resolver.part_ids(&filter, scope)?;
                let parts = self.parts.resolve(&self.catalog, &ids, scope)?;
                let status = if parts.is_empty() {
                    LookupStatus::NoFitment
                } else {
                    LookupStatus::Resolved
                };
                let mut lookup = FitmentLookup::new(status, scope.clone());
                lookup.parts = parts;
                lookup
            }
        };
        lookup.selection = cascade::applied_selection(query);
        debug!(status = ?lookup.status, parts = lookup.parts.len(), "cascade lookup");
        Ok(lookup)
    }

    /// VIN lookup: decode, cross-reference, match, then load parts.
    ///
    /// Decode failures are returned as errors before any lookup is built.
    pub fn lookup_vin(&self, vin: &str, scope: &BrandScope) -> Result<FitmentLookup, FitmentError> {
        check_scope(scope)?;
        let vin = normalize_vin(vin)?;
        let decoded = self.decoder.decode(&vin)?;
        debug!(
            vin = vin.as_str(),
            return_code = decoded.return_code,
            base_vehicle = ?decoded.base_vehicle_external_id,
            attributes = decoded.external_config_attributes.len(),
            "VIN decoded"
        );

        let xref = self.cross_reference.get_or_load(&self.store)?;
        let mapped = xref.map(&decoded.external_config_attributes);
        let vehicles = ConfigurationMatcher::new(&self.store).match_decoded(&decoded)?;

        let mut lookup = self.lookup_for_vehicles(vehicles, scope)?;
        lookup.decoded_configuration = Some(mapped.configuration);
        lookup.unmapped_attributes = mapped.unmapped;
        lookup.decoded_vehicle = Some(decoded);
        info!(
            vin = vin.as_str(),
            status = ?lookup.status,
            vehicles = lookup.resolved_vehicles.len(),
            parts = lookup.parts.len(),
            "VIN lookup"
        );
        Ok(lookup)
    }

    /// Parts for a previously resolved internal vehicle.
    pub fn vehicle_parts(
        &self,
        vehicle_id: i64,
        scope: &BrandScope,
    ) -> Result<FitmentLookup, FitmentError> {
        check_scope(scope)?;
        if vehicle_id <= 0 {
            return Err(FitmentError::invalid("vehicle_id", "must be positive"));
        }
        let vehicles: Vec<InternalVehicle> = ConfigurationMatcher::new(&self.store)
            .by_id(vehicle_id)?
            .into_iter()
            .collect();
        self.lookup_for_vehicles(vehicles, scope)
    }

    /// Rebuild the cross-reference snapshot from master data.
    pub fn reload_cross_reference(&self) -> Result<Arc<CrossReference>, FitmentError> {
        let xref = self.cross_reference.reload(&self.store)?;
        info!(entries = xref.len(), "cross-reference reloaded");
        Ok(xref)
    }

    /// The cross-reference snapshot currently in use, if loaded.
    pub fn cross_reference(&self) -> Option<Arc<CrossReference>> {
        self.cross_reference.snapshot()
    }

    fn lookup_for_vehicles(
        &self,
        vehicles: Vec<InternalVehicle>,
        scope: &BrandScope,
    ) -> Result<FitmentLookup, FitmentError> {
        if vehicles.is_empty() {
            return Ok(FitmentLookup::new(LookupStatus::NoVehicle, scope.clone()));
        }
        let vehicle_ids: Vec<i64> = vehicles.iter().map(|v| v.id).collect();
        let ids = self
            .store
            .vehicle_part_ids(&vehicle_ids, scope)
            .map_err(|e| FitmentError::store(Stage::PartLookup, e))?;
        let parts = self.parts.resolve(&self.catalog, &ids, scope)?;

        let status = if parts.is_empty() {
            LookupStatus::NoFitment
        } else {
            LookupStatus::Resolved
        };
        let mut lookup = FitmentLookup::new(status, scope.clone());
        lookup.resolved_configuration = union_configuration(&vehicles);
        lookup.resolved_vehicles = vehicles;
        lookup.parts = parts;
        Ok(lookup)
    }
}

fn check_scope(scope: &BrandScope) -> Result<(), FitmentError> {
    if scope.is_empty() {
        return Err(FitmentError::invalid("brand scope", "no authorized brands"));
    }
    Ok(())
}
