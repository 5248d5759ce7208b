//! VIN validation and the decoding-service seam.

use super::error::{DecodeError, FitmentError};
use super::types::DecodedVehicle;

/// Length of a post-1981 VIN.
pub const VIN_LENGTH: usize = 17;

/// Decodes a VIN into externally coded vehicle attributes.
///
/// Implemented by `vindecode::VinDecodeClient` for the real service.
pub trait VinDecoder: Send + Sync {
    /// Decode a normalized VIN (see [`normalize_vin`]).
    fn decode(&self, vin: &str) -> Result<DecodedVehicle, DecodeError>;
}

impl<T: VinDecoder + ?Sized> VinDecoder for std::sync::Arc<T> {
    fn decode(&self, vin: &str) -> Result<DecodedVehicle, DecodeError> {
        (**self).decode(vin)
    }
}

/// Trim and upper-case a VIN and check its length and character set.
///
/// VINs are 17 characters of `A-Z` and `0-9`, never containing `I`, `O`
/// or `Q`. The check digit is left to the decoding service.
pub fn normalize_vin(vin: &str) -> Result<String, FitmentError> {
    let vin = vin.trim().to_ascii_uppercase();
    if vin.len() != VIN_LENGTH {
        return Err(FitmentError::invalid(
            "vin",
            format!("expected {VIN_LENGTH} characters, got {}", vin.chars().count()),
        ));
    }
    if let Some(bad) = vin
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() || matches!(c, 'I' | 'O' | 'Q'))
    {
        return Err(FitmentError::invalid(
            "vin",
            format!("character '{bad}' is not allowed"),
        ));
    }
    Ok(vin)
}
