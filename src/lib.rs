//! # fitment
//!
//! Vehicle fitment resolution: given a vehicle (by year/make/model/style
//! cascade, by VIN, or by a previously resolved internal vehicle id), find
//! the aftermarket parts that fit it, restricted to the brands the caller is
//! authorized for.
//!
//! Three lookup paths share one result type, [`FitmentLookup`]:
//!
//! - **cascade**: each call supplies a prefix of year, make, model and style
//!   and gets back the options for the next dimension, or the parts once the
//!   style is known
//! - **VIN**: the VIN is decoded by an external service, its ACES-coded
//!   attributes are cross-referenced to internal configuration values and the
//!   matching internal vehicles are resolved to parts
//! - **vehicle**: parts for an internal vehicle id picked from an earlier
//!   VIN lookup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fitment::core::*;
//! use fitment::resolve::FitmentEngine;
//! use fitment::sqlite::SqliteFitmentStore;
//! use fitment::vindecode::VinDecodeClient;
//!
//! let config = FitmentConfig::load("fitment.toml")?;
//! let store = Arc::new(SqliteFitmentStore::from_config(&config.store)?);
//! let decoder = VinDecodeClient::new(config.vin_decode.clone())?;
//! let engine = FitmentEngine::new(store.clone(), store, decoder, &config.parts)?;
//!
//! let scope = BrandScope::new([1, 3]);
//! let lookup = engine.cascade(&CascadeQuery::new().year("2010").make("Ford"), &scope)?;
//! assert_eq!(lookup.status, LookupStatus::Options(Dimension::Model));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Data model, errors, config, store/catalog/decoder traits, resolution engine |
//! | `vin` | HTTP client and XML envelope for the VIN decoding service |
//! | `sqlite` | SQLite-backed fitment store and part catalog |
//! | `parallel` | Concurrent part batch fetching on a bounded thread pool |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod resolve;

#[cfg(feature = "vin")]
pub mod vindecode;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
