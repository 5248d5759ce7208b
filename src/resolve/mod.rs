//! Fitment resolution stages and the engine composing them.
//!
//! - [`CascadeResolver`] - year → make → model → style
//! - [`CrossReference`] - ACES attribute codes → internal configuration
//! - [`ConfigurationMatcher`] - decoded base vehicle → internal vehicles
//! - [`PartResolver`] - vehicles → brand-scoped parts
//! - [`FitmentEngine`] - the cascade, VIN and vehicle-by-id lookups

mod cascade;
mod crossref;
mod engine;
mod matcher;
mod parts;

pub use cascade::{
    ALL_STYLES, CascadeOptions, CascadeResolver, CascadeStep, applied_selection, compare_names,
    plan, sort_names, sort_years,
};
pub use crossref::{CrossReference, CrossReferenceCache, MappedConfiguration};
pub use engine::FitmentEngine;
pub use matcher::{ConfigurationMatcher, fold_rows, union_configuration};
pub use parts::PartResolver;
