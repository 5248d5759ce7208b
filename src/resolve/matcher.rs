//! Folding of vehicle × attribute rows into vehicle records.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::core::{
    DecodedVehicle, FitmentError, FitmentStore, InternalVehicle, ResolvedConfiguration, Stage,
    VehicleAttributeRow, VehicleConfiguration,
};

/// Selects the internal vehicle records for a decoded vehicle.
pub struct ConfigurationMatcher<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: FitmentStore + ?Sized> ConfigurationMatcher<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Vehicles sharing the decoded base vehicle, with the decoded submodel
    /// or no submodel at all. Zero or several matches are normal.
    pub fn match_decoded(&self, decoded: &DecodedVehicle) -> Result<Vec<InternalVehicle>, FitmentError> {
        let Some(base_id) = decoded.base_vehicle_external_id else {
            debug!(vin = decoded.vin.as_str(), "decoded vehicle has no base vehicle id");
            return Ok(Vec::new());
        };
        let rows = self
            .store
            .vehicle_rows(base_id, decoded.submodel_external_id)
            .map_err(|e| FitmentError::store(Stage::ConfigurationMatch, e))?;
        let vehicles = fold_rows(rows, Some(base_id));
        debug!(
            base_vehicle = base_id,
            submodel = ?decoded.submodel_external_id,
            matches = vehicles.len(),
            "configuration match"
        );
        Ok(vehicles)
    }

    /// One vehicle by internal id.
    pub fn by_id(&self, vehicle_id: i64) -> Result<Option<InternalVehicle>, FitmentError> {
        let rows = self
            .store
            .vehicle_rows_by_id(vehicle_id)
            .map_err(|e| FitmentError::store(Stage::ConfigurationMatch, e))?;
        Ok(fold_rows(rows, None)
            .into_iter()
            .find(|v| v.id == vehicle_id))
    }
}

/// Group rows by vehicle id, accumulating each vehicle's configuration.
///
/// When `base_vehicle_external_id` is given, rows for any other base vehicle
/// are discarded. Output is ordered by vehicle id.
pub fn fold_rows(
    rows: impl IntoIterator<Item = VehicleAttributeRow>,
    base_vehicle_external_id: Option<i64>,
) -> Vec<InternalVehicle> {
    let mut vehicles: BTreeMap<i64, InternalVehicle> = BTreeMap::new();
    for row in rows {
        if let Some(expected) = base_vehicle_external_id {
            if row.base_vehicle.external_id != Some(expected) {
                warn!(
                    vehicle_id = row.vehicle_id,
                    expected,
                    got = ?row.base_vehicle.external_id,
                    "discarding row for a different base vehicle"
                );
                continue;
            }
        }
        let vehicle = vehicles
            .entry(row.vehicle_id)
            .or_insert_with(|| InternalVehicle {
                id: row.vehicle_id,
                base_vehicle: row.base_vehicle.clone(),
                submodel: row.submodel.clone(),
                configuration: VehicleConfiguration::new(),
            });
        if let Some((type_name, value)) = row.attribute {
            vehicle.configuration.insert(type_name, value);
        }
    }
    vehicles.into_values().collect()
}

/// Union of every configuration dimension across the matched vehicles.
pub fn union_configuration(vehicles: &[InternalVehicle]) -> ResolvedConfiguration {
    let mut union = ResolvedConfiguration::new();
    for vehicle in vehicles {
        for (type_name, value) in vehicle.configuration.iter() {
            let values = union.entry(type_name.to_string()).or_default();
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }
    }
    for values in union.values_mut() {
        values.sort();
    }
    union
}
