use std::fmt;

use thiserror::Error;

/// Resolution stage, attached to dependency failures so callers can tell a
/// failed VIN decode from a failed match or part fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Cascade,
    VinDecode,
    CrossReference,
    ConfigurationMatch,
    PartLookup,
    PartFetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cascade => "cascade",
            Self::VinDecode => "vin_decode",
            Self::CrossReference => "cross_reference",
            Self::ConfigurationMatch => "configuration_match",
            Self::PartLookup => "part_lookup",
            Self::PartFetch => "part_fetch",
        })
    }
}

/// Errors that can occur while resolving fitment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FitmentError {
    /// Caller supplied malformed input (bad VIN, non-numeric year, ...).
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The VIN decoding service rejected or failed the request.
    #[error("VIN decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The relational vehicle store failed.
    #[error("{stage} failed: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    /// The parts catalog failed.
    #[error("part fetch failed: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The part-fetch worker pool could not be started.
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl FitmentError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn store(stage: Stage, source: StoreError) -> Self {
        Self::Store { stage, source }
    }

    /// The stage that failed, for dependency and decode failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Decode(_) => Some(Stage::VinDecode),
            Self::Store { stage, .. } => Some(*stage),
            Self::Catalog(_) => Some(Stage::PartFetch),
            _ => None,
        }
    }

    /// Whether this is a client error (bad input) rather than a service failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

/// Classified failures of the VIN decoding service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Return code 4: the check digit was calculated but does not match.
    #[error("VIN checksum does not match")]
    ChecksumMismatch,

    /// Return code 5: the check digit could not be calculated.
    #[error("VIN checksum could not be calculated")]
    InvalidChecksum,

    /// Return code 6: the account is not licensed for this VIN's data.
    #[error("not licensed to decode this VIN")]
    Unauthorized,

    /// Any other non-success return code.
    #[error("decode service returned code {code}")]
    ServiceError { code: i32 },

    /// The service did not answer within the configured timeout.
    #[error("decode service timed out")]
    Timeout,

    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("decode service responded with HTTP {status}")]
    HttpStatus { status: u16 },

    /// The response envelope could not be parsed.
    #[error("malformed decode response: {0}")]
    Malformed(String),
}

impl DecodeError {
    /// Map a service return code to a failure. Codes 0..=3 are success.
    pub fn from_return_code(code: i32) -> Option<Self> {
        match code {
            0..=3 => None,
            4 => Some(Self::ChecksumMismatch),
            5 => Some(Self::InvalidChecksum),
            6 => Some(Self::Unauthorized),
            code => Some(Self::ServiceError { code }),
        }
    }
}

/// Relational store failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("store busy: query timed out")]
    Timeout,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Parts catalog failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("catalog query failed: {0}")]
    Query(String),
}

/// Configuration failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
