//! Year → make → model → style cascade.

use std::cmp::Ordering;

use tracing::debug;

use crate::core::{
    BrandScope, CascadeFilter, CascadeQuery, Dimension, FitmentError, FitmentStore, Stage,
    StoreError,
};

/// Style value that selects every submodel of a year/make/model.
pub const ALL_STYLES: &str = "All";

/// The normalized position of a cascade query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeStep {
    /// The next dimension needing a value.
    Options(Dimension, CascadeFilter),
    /// All four dimensions supplied.
    Terminal(CascadeFilter),
}

/// Next options of a cascade, already ordered and de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOptions {
    Years(Vec<i32>),
    Names(Dimension, Vec<String>),
}

/// Resolves cascade queries against a [`FitmentStore`].
pub struct CascadeResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: FitmentStore + ?Sized> CascadeResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Distinct values for the step's dimension.
    pub fn options(
        &self,
        dimension: Dimension,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<CascadeOptions, FitmentError> {
        let wrap = |e: StoreError| FitmentError::store(Stage::Cascade, e);
        let options = match dimension {
            Dimension::Year => CascadeOptions::Years(sort_years(
                self.store.years(scope).map_err(wrap)?,
            )),
            Dimension::Make => CascadeOptions::Names(
                dimension,
                sort_names(self.store.makes(filter, scope).map_err(wrap)?),
            ),
            Dimension::Model => CascadeOptions::Names(
                dimension,
                sort_names(self.store.models(filter, scope).map_err(wrap)?),
            ),
            Dimension::Style => CascadeOptions::Names(
                dimension,
                sort_names(self.store.styles(filter, scope).map_err(wrap)?),
            ),
        };
        debug!(%dimension, count = options.len(), "cascade options");
        Ok(options)
    }

    /// Part ids for a fully specified cascade.
    pub fn part_ids(
        &self,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<Vec<i64>, FitmentError> {
        let mut ids = self
            .store
            .cascade_part_ids(filter, scope)
            .map_err(|e| FitmentError::store(Stage::Cascade, e))?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

impl CascadeOptions {
    pub fn len(&self) -> usize {
        match self {
            Self::Years(v) => v.len(),
            Self::Names(_, v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Work out which stage a raw query is at.
///
/// Dimensions are positional: the first missing one is the stage, and any
/// value after the gap is ignored. Blank values count as missing. A
/// non-numeric year is an input error; other values are not validated.
pub fn plan(query: &CascadeQuery) -> Result<CascadeStep, FitmentError> {
    let year = match non_blank(&query.year) {
        None => return Ok(CascadeStep::Options(Dimension::Year, CascadeFilter::default())),
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| FitmentError::invalid("year", format!("'{raw}' is not a number")))?,
    };
    let mut filter = CascadeFilter {
        year: Some(year),
        ..Default::default()
    };

    let Some(make) = non_blank(&query.make) else {
        log_ignored(query, Dimension::Make);
        return Ok(CascadeStep::Options(Dimension::Make, filter));
    };
    filter.make = Some(make.to_string());

    let Some(model) = non_blank(&query.model) else {
        log_ignored(query, Dimension::Model);
        return Ok(CascadeStep::Options(Dimension::Model, filter));
    };
    filter.model = Some(model.to_string());

    let Some(style) = non_blank(&query.style) else {
        return Ok(CascadeStep::Options(Dimension::Style, filter));
    };
    if !style.eq_ignore_ascii_case(ALL_STYLES) {
        filter.style = Some(style.to_string());
    }
    Ok(CascadeStep::Terminal(filter))
}

/// The query as it was applied: trimmed, with values after a gap removed.
pub fn applied_selection(query: &CascadeQuery) -> CascadeQuery {
    let mut applied = CascadeQuery::default();
    let fields = [
        (&query.year, &mut applied.year),
        (&query.make, &mut applied.make),
        (&query.model, &mut applied.model),
        (&query.style, &mut applied.style),
    ];
    for (src, dst) in fields {
        match non_blank(src) {
            Some(v) => *dst = Some(v.to_string()),
            None => break,
        }
    }
    applied
}

/// Years newest first, without duplicates.
pub fn sort_years(mut years: Vec<i32>) -> Vec<i32> {
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Names in case-insensitive alphabetical order, without duplicates.
///
/// Selections match names case-insensitively, so `"Ford"` and `"FORD"` are
/// one option. The byte-wise smallest spelling is kept.
pub fn sort_names(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|a, b| compare_names(a, b));
    names.dedup_by(|next, kept| next.to_lowercase() == kept.to_lowercase());
    names
}

/// Ordering used for make, model and style lists.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn log_ignored(query: &CascadeQuery, missing: Dimension) {
    let later = match missing {
        Dimension::Make => [&query.model, &query.style],
        Dimension::Model => [&query.style, &None],
        _ => return,
    };
    if later.iter().any(|v| non_blank(v).is_some()) {
        debug!(%missing, "ignoring cascade values supplied after a missing dimension");
    }
}
