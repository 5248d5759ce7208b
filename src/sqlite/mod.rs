//! SQLite-backed vehicle master data and part catalog.
//!
//! [`SqliteFitmentStore`] answers both the fitment queries
//! ([`FitmentStore`](crate::core::FitmentStore)) and part record fetches
//! ([`PartCatalog`](crate::core::PartCatalog)) from one database. The
//! schema it expects is created by [`SqliteFitmentStore::init_schema`].

mod store;

pub use store::SqliteFitmentStore;
