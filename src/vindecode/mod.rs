//! VIN decoding over the external ACES-coded decode service.
//!
//! The protocol is one XML request/response exchange:
//!
//! - request: `<VinDecodeRequest>` naming the VIN and the requested field codes
//! - response: `<VinDecodeResponse>` with a return code, the VIN, a possibly
//!   corrected VIN and `<Field name="…">value</Field>` pairs
//!
//! Return codes 0–3 are success; 4, 5 and 6 map to
//! [`DecodeError::ChecksumMismatch`], [`DecodeError::InvalidChecksum`] and
//! [`DecodeError::Unauthorized`]; anything else to
//! [`DecodeError::ServiceError`].
//!
//! # Example
//!
//! ```no_run
//! use fitment::core::{VinDecodeConfig, VinDecoder};
//! use fitment::vindecode::VinDecodeClient;
//!
//! let client = VinDecodeClient::new(VinDecodeConfig {
//!     endpoint: "https://vin.example.com/decode".into(),
//!     username: "catalog".into(),
//!     secret: "s3cret".into(),
//!     timeout_secs: 10,
//! })?;
//! let decoded = client.decode("3FAHP0HA6AR123456")?;
//! println!("base vehicle {:?}", decoded.base_vehicle_external_id);
//! # Ok::<(), fitment::core::DecodeError>(())
//! ```
//!
//! [`DecodeError::ChecksumMismatch`]: crate::core::DecodeError::ChecksumMismatch
//! [`DecodeError::InvalidChecksum`]: crate::core::DecodeError::InvalidChecksum
//! [`DecodeError::Unauthorized`]: crate::core::DecodeError::Unauthorized
//! [`DecodeError::ServiceError`]: crate::core::DecodeError::ServiceError

mod client;
mod envelope;
pub mod fields;

pub use client::VinDecodeClient;
pub use envelope::{
    DecodeResponse, REQUEST_ROOT, RESPONSE_ROOT, build_request, decode_response, parse_response,
};
