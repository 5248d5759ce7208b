//! Core fitment types, errors, configuration, and collaborator traits.
//!
//! The engine talks to three collaborators through traits defined here:
//! the relational vehicle schema ([`FitmentStore`]), the parts catalog
//! ([`PartCatalog`]) and the VIN decoding service ([`VinDecoder`]).

mod catalog;
mod config;
mod error;
mod store;
mod types;
mod vin;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use store::*;
pub use types::*;
pub use vin::*;
