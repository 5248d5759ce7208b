//! Cross-reference from externally coded (ACES) attributes to the internal
//! configuration vocabulary.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::core::{
    AttributeValue, ConfigAttribute, ConfigAttributeType, FitmentError, FitmentStore, Stage,
    UnmappedAttribute, VehicleConfiguration,
};

/// Result of mapping decoded attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedConfiguration {
    pub configuration: VehicleConfiguration,
    /// Attributes that had a value but no cross-reference entry.
    pub unmapped: Vec<UnmappedAttribute>,
}

/// Immutable `"typeCode:valueCode"` → `(type name, value)` table.
#[derive(Debug, Clone)]
pub struct CrossReference {
    entries: HashMap<String, (String, String)>,
    loaded_at: DateTime<Utc>,
}

impl CrossReference {
    /// Build the table from master data. Types without an external code and
    /// attributes without an external value are left out. When two
    /// attributes claim the same key the lower id wins.
    pub fn build(types: &[ConfigAttributeType], attributes: &[ConfigAttribute]) -> Self {
        let type_index: HashMap<i64, (&str, &str)> = types
            .iter()
            .filter_map(|t| {
                let code = t.external_type_code.as_deref()?.trim();
                (!code.is_empty()).then_some((t.id, (code, t.name.as_str())))
            })
            .collect();

        let mut ordered: Vec<&ConfigAttribute> = attributes.iter().collect();
        ordered.sort_by_key(|a| a.id);

        let mut entries = HashMap::with_capacity(ordered.len());
        for attr in ordered {
            let Some((type_code, type_name)) = type_index.get(&attr.type_id) else {
                continue;
            };
            let Some(value_code) = attr
                .external_value_code
                .as_deref()
                .and_then(AttributeValue::parse)
            else {
                continue;
            };
            let key = composite_key(type_code, &value_code.to_string());
            if entries.contains_key(&key) {
                warn!(
                    key = key.as_str(),
                    attribute_id = attr.id,
                    "duplicate cross-reference key in master data, keeping first"
                );
                continue;
            }
            entries.insert(key, (type_name.to_string(), attr.value.clone()));
        }

        Self {
            entries,
            loaded_at: Utc::now(),
        }
    }

    /// Load master data from the store and build the table.
    pub fn load<S: FitmentStore + ?Sized>(store: &S) -> Result<Self, FitmentError> {
        let wrap = |e| FitmentError::store(Stage::CrossReference, e);
        let types = store.config_attribute_types().map_err(wrap)?;
        let attributes = store.config_attributes().map_err(wrap)?;
        let xref = Self::build(&types, &attributes);
        info!(
            types = types.len(),
            attributes = attributes.len(),
            entries = xref.len(),
            "cross-reference loaded"
        );
        Ok(xref)
    }

    /// Translate decoded attributes into internal configuration.
    ///
    /// Absent values are skipped. Values without an entry are reported in
    /// `unmapped` and otherwise ignored; an unmapped dimension never fails
    /// the lookup.
    pub fn map(&self, external: &BTreeMap<String, AttributeValue>) -> MappedConfiguration {
        let mut mapped = MappedConfiguration::default();
        for (type_code, value) in external {
            if !value.is_present() {
                continue;
            }
            let value = value.to_string();
            match self.entries.get(&composite_key(type_code, &value)) {
                Some((type_name, internal)) => {
                    mapped.configuration.insert(type_name.clone(), internal.clone());
                }
                None => mapped.unmapped.push(UnmappedAttribute {
                    type_code: type_code.clone(),
                    value,
                }),
            }
        }
        if !mapped.unmapped.is_empty() {
            debug!(
                unmapped = mapped.unmapped.len(),
                mapped = mapped.configuration.len(),
                "attributes without cross-reference"
            );
        }
        mapped
    }

    /// Look up one external code pair. Numeric codes compare by value, so
    /// `"06"` and `"6"` are the same code.
    pub fn get(&self, type_code: &str, value_code: &str) -> Option<(&str, &str)> {
        let value = AttributeValue::parse(value_code)?;
        self.entries
            .get(&composite_key(type_code, &value.to_string()))
            .map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

fn composite_key(type_code: &str, value_code: &str) -> String {
    format!("{type_code}:{value_code}")
}

/// Process-wide handle to the current cross-reference snapshot.
///
/// The snapshot is loaded on first use and only replaced by [`reload`].
/// Readers hold an `Arc` to the snapshot they started with.
///
/// [`reload`]: CrossReferenceCache::reload
#[derive(Debug, Default)]
pub struct CrossReferenceCache {
    current: RwLock<Option<Arc<CrossReference>>>,
}

impl CrossReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already built snapshot.
    pub fn with_snapshot(xref: CrossReference) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(xref))),
        }
    }

    /// The current snapshot, loading it from the store if none exists yet.
    pub fn get_or_load<S: FitmentStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Arc<CrossReference>, FitmentError> {
        if let Some(xref) = self.snapshot() {
            return Ok(xref);
        }
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have loaded it while we waited for the lock.
        if let Some(xref) = slot.as_ref() {
            return Ok(Arc::clone(xref));
        }
        let xref = Arc::new(CrossReference::load(store)?);
        *slot = Some(Arc::clone(&xref));
        Ok(xref)
    }

    /// Rebuild from the store and swap in the new snapshot. On failure the
    /// previous snapshot stays in place.
    pub fn reload<S: FitmentStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Arc<CrossReference>, FitmentError> {
        let xref = Arc::new(CrossReference::load(store)?);
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&xref));
        Ok(xref)
    }

    /// The current snapshot without loading.
    pub fn snapshot(&self) -> Option<Arc<CrossReference>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
