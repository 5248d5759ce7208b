//! Engine configuration loaded from TOML with environment overrides.
//!
//! Loading order:
//! 1. TOML file (`FitmentConfig::from_file`)
//! 2. Environment variables (`FITMENT_{SECTION}_{FIELD}`)
//! 3. Defaults for anything left unset
//!
//! ```
//! use fitment::core::FitmentConfig;
//!
//! let config = FitmentConfig::parse(r#"
//! [vin_decode]
//! endpoint = "https://vin.example.com/decode"
//! username = "catalog"
//! secret = "s3cret"
//!
//! [parts]
//! max_concurrency = 2
//! "#).unwrap();
//! assert_eq!(config.parts.max_concurrency, 2);
//! assert_eq!(config.store.published_statuses, vec![800, 900]);
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitmentConfig {
    #[serde(default)]
    pub vin_decode: VinDecodeConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub parts: PartsConfig,
}

/// Connection settings for the external VIN decoding service.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VinDecodeConfig {
    pub endpoint: String,
    pub username: String,
    /// Shared secret used as the basic-auth password.
    pub secret: String,
    pub timeout_secs: u64,
}

impl VinDecodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.secret.is_empty()
    }
}

impl Default for VinDecodeConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            secret: String::new(),
            timeout_secs: 15,
        }
    }
}

impl fmt::Debug for VinDecodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VinDecodeConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Relational vehicle store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database path. `:memory:` opens a private in-memory database.
    pub path: String,
    /// How long a store call may take, counting waits on the shared
    /// connection and on a locked database file.
    pub busy_timeout_ms: u64,
    /// Part status codes that count as published.
    pub published_statuses: Vec<i32>,
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "fitment.db".to_string(),
            busy_timeout_ms: 5_000,
            published_statuses: vec![800, 900],
        }
    }
}

/// Part loading settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartsConfig {
    /// Part ids per catalog request.
    pub batch_size: usize,
    /// Concurrent catalog requests per lookup.
    pub max_concurrency: usize,
}

impl Default for PartsConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_concurrency: 4,
        }
    }
}

const MAX_CONCURRENCY: usize = 64;

impl FitmentConfig {
    /// Load from a TOML file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file without environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parse a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })
    }

    /// Override values from `FITMENT_{SECTION}_{FIELD}` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override values from an arbitrary key lookup (environment, secrets store).
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_string(&mut self.vin_decode.endpoint, "FITMENT_VIN_DECODE_ENDPOINT", &lookup);
        override_string(&mut self.vin_decode.username, "FITMENT_VIN_DECODE_USERNAME", &lookup);
        override_string(&mut self.vin_decode.secret, "FITMENT_VIN_DECODE_SECRET", &lookup);
        override_parsed(
            &mut self.vin_decode.timeout_secs,
            "FITMENT_VIN_DECODE_TIMEOUT_SECS",
            &lookup,
        );

        override_string(&mut self.store.path, "FITMENT_STORE_PATH", &lookup);
        override_parsed(
            &mut self.store.busy_timeout_ms,
            "FITMENT_STORE_BUSY_TIMEOUT_MS",
            &lookup,
        );
        if let Some(raw) = lookup("FITMENT_STORE_PUBLISHED_STATUSES") {
            let parsed: Result<Vec<i32>, _> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(statuses) => self.store.published_statuses = statuses,
                Err(_) => warn!(
                    env_key = "FITMENT_STORE_PUBLISHED_STATUSES",
                    value = raw.as_str(),
                    "failed to parse status list, ignoring"
                ),
            }
        }

        override_parsed(&mut self.parts.batch_size, "FITMENT_PARTS_BATCH_SIZE", &lookup);
        override_parsed(
            &mut self.parts.max_concurrency,
            "FITMENT_PARTS_MAX_CONCURRENCY",
            &lookup,
        );
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vin = &self.vin_decode;
        if !vin.endpoint.is_empty()
            && !(vin.endpoint.starts_with("https://") || vin.endpoint.starts_with("http://"))
        {
            return Err(invalid("vin_decode.endpoint", "must be an http(s) URL"));
        }
        if vin.has_credentials() && vin.endpoint.is_empty() {
            return Err(invalid(
                "vin_decode.endpoint",
                "required when credentials are configured",
            ));
        }
        if vin.timeout_secs == 0 {
            return Err(invalid("vin_decode.timeout_secs", "must be greater than 0"));
        }
        if self.store.path.trim().is_empty() {
            return Err(invalid("store.path", "must not be empty"));
        }
        if self.store.published_statuses.is_empty() {
            return Err(invalid(
                "store.published_statuses",
                "at least one status is required",
            ));
        }
        if self.parts.batch_size == 0 {
            return Err(invalid("parts.batch_size", "must be greater than 0"));
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.parts.max_concurrency) {
            return Err(invalid(
                "parts.max_concurrency",
                format!("must be between 1 and {MAX_CONCURRENCY}"),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn override_string(target: &mut String, key: &str, lookup: &impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup(key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(
    target: &mut T,
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) {
    if let Some(val) = lookup(key) {
        match val.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key = key,
                value = val.as_str(),
                "failed to parse value from env var, ignoring"
            ),
        }
    }
}
