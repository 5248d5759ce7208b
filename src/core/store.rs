//! Read-only access to the relational vehicle schema.

use std::sync::Arc;

use super::error::StoreError;
use super::types::{BaseVehicle, BrandScope, ConfigAttribute, ConfigAttributeType, Submodel};

/// Normalized cascade filter. Dimensions are applied in order; a `None`
/// stops filtering at that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeFilter {
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    /// `None` matches every submodel (the `All` style).
    pub style: Option<String>,
}

/// One row of the vehicle × configuration-attribute join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleAttributeRow {
    pub vehicle_id: i64,
    pub base_vehicle: BaseVehicle,
    pub submodel: Option<Submodel>,
    /// `(type name, value)`; `None` for vehicles without configuration.
    pub attribute: Option<(String, String)>,
}

/// Queries the fitment engine issues against the vehicle schema.
///
/// Implementations only return parts whose status is published and whose
/// brand is in the supplied scope.
pub trait FitmentStore: Send + Sync {
    /// Distinct model years with at least one fitting part.
    fn years(&self, scope: &BrandScope) -> Result<Vec<i32>, StoreError>;

    /// Distinct make names for a year.
    fn makes(&self, filter: &CascadeFilter, scope: &BrandScope) -> Result<Vec<String>, StoreError>;

    /// Distinct model names for a year and make.
    fn models(&self, filter: &CascadeFilter, scope: &BrandScope)
    -> Result<Vec<String>, StoreError>;

    /// Distinct submodel (style) names for a year, make and model.
    fn styles(&self, filter: &CascadeFilter, scope: &BrandScope)
    -> Result<Vec<String>, StoreError>;

    /// Part ids fitting a fully specified cascade filter.
    fn cascade_part_ids(
        &self,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<Vec<i64>, StoreError>;

    /// All configuration attribute types (master data).
    fn config_attribute_types(&self) -> Result<Vec<ConfigAttributeType>, StoreError>;

    /// All configuration attributes (master data).
    fn config_attributes(&self) -> Result<Vec<ConfigAttribute>, StoreError>;

    /// Vehicle × attribute rows for an external base vehicle, restricted to
    /// the given external submodel or vehicles without a submodel.
    fn vehicle_rows(
        &self,
        base_vehicle_external_id: i64,
        submodel_external_id: Option<i64>,
    ) -> Result<Vec<VehicleAttributeRow>, StoreError>;

    /// Vehicle × attribute rows for one internal vehicle id.
    fn vehicle_rows_by_id(&self, vehicle_id: i64) -> Result<Vec<VehicleAttributeRow>, StoreError>;

    /// Part ids fitting any of the given vehicles.
    fn vehicle_part_ids(
        &self,
        vehicle_ids: &[i64],
        scope: &BrandScope,
    ) -> Result<Vec<i64>, StoreError>;
}

impl<T: FitmentStore + ?Sized> FitmentStore for Arc<T> {
    fn years(&self, scope: &BrandScope) -> Result<Vec<i32>, StoreError> {
        (**self).years(scope)
    }

    fn makes(&self, filter: &CascadeFilter, scope: &BrandScope) -> Result<Vec<String>, StoreError> {
        (**self).makes(filter, scope)
    }

    fn models(
        &self,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<Vec<String>, StoreError> {
        (**self).models(filter, scope)
    }

    fn styles(
        &self,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<Vec<String>, StoreError> {
        (**self).styles(filter, scope)
    }

    fn cascade_part_ids(
        &self,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<Vec<i64>, StoreError> {
        (**self).cascade_part_ids(filter, scope)
    }

    fn config_attribute_types(&self) -> Result<Vec<ConfigAttributeType>, StoreError> {
        (**self).config_attribute_types()
    }

    fn config_attributes(&self) -> Result<Vec<ConfigAttribute>, StoreError> {
        (**self).config_attributes()
    }

    fn vehicle_rows(
        &self,
        base_vehicle_external_id: i64,
        submodel_external_id: Option<i64>,
    ) -> Result<Vec<VehicleAttributeRow>, StoreError> {
        (**self).vehicle_rows(base_vehicle_external_id, submodel_external_id)
    }

    fn vehicle_rows_by_id(&self, vehicle_id: i64) -> Result<Vec<VehicleAttributeRow>, StoreError> {
        (**self).vehicle_rows_by_id(vehicle_id)
    }

    fn vehicle_part_ids(
        &self,
        vehicle_ids: &[i64],
        scope: &BrandScope,
    ) -> Result<Vec<i64>, StoreError> {
        (**self).vehicle_part_ids(vehicle_ids, scope)
    }
}
