use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A year/make/model combination, independent of trim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseVehicle {
    /// Internal base vehicle id.
    pub id: i64,
    /// ACES BaseVehicleID used by the VIN decoding service.
    pub external_id: Option<i64>,
    /// Model year, e.g. 2010.
    pub year_id: i32,
    pub make_id: i64,
    pub make_name: String,
    pub model_id: i64,
    pub model_name: String,
}

/// Refinement of a base vehicle (trim level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submodel {
    pub id: i64,
    /// ACES SubmodelID.
    pub external_id: Option<i64>,
    pub name: String,
}

/// A category of configuration, e.g. "Drive Type".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAttributeType {
    pub id: i64,
    /// Internal display name.
    pub name: String,
    /// Field code used by the decoding service (e.g. "DriveTypeID").
    pub external_type_code: Option<String>,
}

/// A concrete value within a [`ConfigAttributeType`], e.g. Drive Type = "4WD".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAttribute {
    pub id: i64,
    pub type_id: i64,
    pub value: String,
    /// Value code used by the decoding service for the same concept.
    pub external_value_code: Option<String>,
}

/// Distinguishing options of one vehicle record: type name → value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleConfiguration(BTreeMap<String, String>);

impl VehicleConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for a configuration dimension, returning the previous one.
    pub fn insert(&mut self, type_name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(type_name.into(), value.into())
    }

    pub fn get(&self, type_name: &str) -> Option<&str> {
        self.0.get(type_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for VehicleConfiguration {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Union of configuration dimensions across one or more matched vehicles:
/// type name → distinct values, sorted.
pub type ResolvedConfiguration = BTreeMap<String, Vec<String>>;

/// One distinct fitment-relevant vehicle build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalVehicle {
    pub id: i64,
    pub base_vehicle: BaseVehicle,
    pub submodel: Option<Submodel>,
    pub configuration: VehicleConfiguration,
}

/// A raw attribute value reported by the decoding service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Numeric code (most ACES fields).
    Code(i64),
    /// Free text for fields that are not numeric.
    Text(String),
}

impl AttributeValue {
    /// Parse raw field text. Returns `None` for empty input ("not supplied").
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.parse::<i64>() {
            Ok(code) => Self::Code(code),
            Err(_) => Self::Text(raw.to_string()),
        })
    }

    /// Whether the value carries information. Non-positive codes and empty
    /// text are placeholders the service uses for "unknown".
    pub fn is_present(&self) -> bool {
        match self {
            Self::Code(code) => *code > 0,
            Self::Text(text) => !text.trim().is_empty(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Transient result of decoding a VIN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedVehicle {
    /// VIN as submitted.
    pub vin: String,
    /// VIN as corrected by the service, if it differs.
    pub corrected_vin: Option<String>,
    /// Raw service return code (0..=3 on success).
    pub return_code: i32,
    pub base_vehicle_external_id: Option<i64>,
    pub make_external_id: Option<i64>,
    pub model_external_id: Option<i64>,
    pub submodel_external_id: Option<i64>,
    pub year_id: Option<i32>,
    pub region_id: Option<i64>,
    /// External type code (service field name) → value.
    pub external_config_attributes: BTreeMap<String, AttributeValue>,
}

/// An externally coded attribute that had no internal equivalent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnmappedAttribute {
    pub type_code: String,
    pub value: String,
}

/// Catalog part, owned by the catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub brand_id: i64,
    pub status: i32,
    pub short_description: Option<String>,
}

/// The set of brands a caller is authorized to see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandScope(BTreeSet<i64>);

impl BrandScope {
    pub fn new(brands: impl IntoIterator<Item = i64>) -> Self {
        Self(brands.into_iter().collect())
    }

    pub fn contains(&self, brand_id: i64) -> bool {
        self.0.contains(&brand_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<i64> for BrandScope {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A selectable cascade dimension, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Year,
    Make,
    Model,
    Style,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Year => "year",
            Self::Make => "make",
            Self::Model => "model",
            Self::Style => "style",
        })
    }
}

/// Raw cascade parameters as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CascadeQuery {
    pub year: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub style: Option<String>,
}

impl CascadeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn make(mut self, make: impl Into<String>) -> Self {
        self.make = Some(make.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Outcome of a lookup, distinguishing dead ends from hard errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "dimension", rename_all = "snake_case")]
pub enum LookupStatus {
    /// The cascade needs a value for this dimension; see the matching
    /// `available_*` list (possibly empty).
    Options(Dimension),
    /// A vehicle was resolved and at least one part fits.
    Resolved,
    /// No vehicle record matched the input.
    NoVehicle,
    /// A vehicle was resolved but no in-scope part fits it.
    NoFitment,
}

/// Aggregate response of every lookup path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitmentLookup {
    pub status: LookupStatus,
    /// Cascade parameters that were applied, after normalization.
    pub selection: CascadeQuery,
    pub available_years: Vec<i32>,
    pub available_makes: Vec<String>,
    pub available_models: Vec<String>,
    pub available_styles: Vec<String>,
    pub decoded_vehicle: Option<DecodedVehicle>,
    pub resolved_vehicles: Vec<InternalVehicle>,
    pub resolved_configuration: ResolvedConfiguration,
    /// Configuration decoded from the VIN, mapped to internal vocabulary.
    /// Informational; not used to narrow `resolved_vehicles`.
    pub decoded_configuration: Option<VehicleConfiguration>,
    pub unmapped_attributes: Vec<UnmappedAttribute>,
    pub parts: Vec<Part>,
    pub brand_scope: BrandScope,
}

impl FitmentLookup {
    pub fn new(status: LookupStatus, brand_scope: BrandScope) -> Self {
        Self {
            status,
            selection: CascadeQuery::default(),
            available_years: Vec::new(),
            available_makes: Vec::new(),
            available_models: Vec::new(),
            available_styles: Vec::new(),
            decoded_vehicle: None,
            resolved_vehicles: Vec::new(),
            resolved_configuration: ResolvedConfiguration::new(),
            decoded_configuration: None,
            unmapped_attributes: Vec::new(),
            parts: Vec::new(),
            brand_scope,
        }
    }

    /// Whether the lookup ended on a fitment: a vehicle was found and parts fit.
    pub fn has_fitment(&self) -> bool {
        self.status == LookupStatus::Resolved && !self.parts.is_empty()
    }
}

/// A lookup request, used to derive cache keys for the external cache layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum LookupRequest {
    Cascade(CascadeQuery),
    Vin { vin: String },
    Vehicle { vehicle_id: i64 },
}

impl LookupRequest {
    /// Stable key for identical lookups: serialized request plus brand scope.
    pub fn cache_key(&self, scope: &BrandScope) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Key<'a> {
            request: &'a LookupRequest,
            brands: &'a BrandScope,
        }
        serde_json::to_string(&Key {
            request: self,
            brands: scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_value_parsing() {
        assert_eq!(AttributeValue::parse("42"), Some(AttributeValue::Code(42)));
        assert_eq!(AttributeValue::parse(" 7 "), Some(AttributeValue::Code(7)));
        assert_eq!(
            AttributeValue::parse("F-150"),
            Some(AttributeValue::Text("F-150".into()))
        );
        assert_eq!(AttributeValue::parse(""), None);
        assert_eq!(AttributeValue::parse("   "), None);
    }

    #[test]
    fn non_positive_codes_are_absent() {
        assert!(!AttributeValue::Code(0).is_present());
        assert!(!AttributeValue::Code(-1).is_present());
        assert!(AttributeValue::Code(1).is_present());
        assert!(AttributeValue::Text("AWD".into()).is_present());
    }

    #[test]
    fn brand_scope_is_ordered_and_deduplicated() {
        let scope = BrandScope::new([3, 1, 3, 2]);
        assert_eq!(scope.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(scope.contains(2));
        assert!(!scope.contains(4));
    }

    #[test]
    fn cache_key_depends_on_request_and_scope() {
        let req = LookupRequest::Cascade(CascadeQuery::new().year("2010").make("Ford"));
        let a = req.cache_key(&BrandScope::new([1])).unwrap();
        let b = req.cache_key(&BrandScope::new([1])).unwrap();
        let c = req.cache_key(&BrandScope::new([1, 3])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.contains("\"path\":\"cascade\""));
        assert!(a.contains("\"brands\":[1]"));
    }

    #[test]
    fn cache_key_ignores_brand_insertion_order() {
        let req = LookupRequest::Vin {
            vin: "1FAHP3FN8AW123456".into(),
        };
        assert_eq!(
            req.cache_key(&BrandScope::new([3, 1])).unwrap(),
            req.cache_key(&BrandScope::new([1, 3])).unwrap()
        );
    }

    #[test]
    fn cache_keys_are_never_blank() {
        let scope = BrandScope::new([1]);
        let keys = [
            LookupRequest::Cascade(CascadeQuery::new()),
            LookupRequest::Vin { vin: String::new() },
            LookupRequest::Vehicle { vehicle_id: 0 },
        ]
        .map(|req| req.cache_key(&scope).unwrap());
        assert!(keys.iter().all(|k| !k.is_empty()));
        assert_ne!(keys[1], keys[2]);
    }

    #[test]
    fn lookup_status_serializes_with_dimension() {
        let json = serde_json::to_string(&LookupStatus::Options(Dimension::Make)).unwrap();
        assert_eq!(json, r#"{"kind":"options","dimension":"make"}"#);
        let json = serde_json::to_string(&LookupStatus::NoFitment).unwrap();
        assert_eq!(json, r#"{"kind":"no_fitment"}"#);
    }
}
