use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const MIN_TTL_SECS: u64 = 5;
pub const MAX_TTL_SECS: u64 = 300;
pub const DEFAULT_TTL_SECS: u64 = 10;
pub const MIN_AMOUNT_PER_PAGE: usize = 1;
pub const MAX_AMOUNT_PER_PAGE: usize = 24;
pub const DEFAULT_AMOUNT_PER_PAGE: usize = 12;
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS);

pub fn clamp_ttl(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_TTL_SECS, MAX_TTL_SECS))
}

pub fn clamp_amount_per_page(amount: usize) -> usize {
    amount.clamp(MIN_AMOUNT_PER_PAGE, MAX_AMOUNT_PER_PAGE)
}

/// Tunables for a [`crate::LifecycleCache`] and the sessions placed in it.
///
/// Every field is optional in the TOML form; values outside the supported
/// ranges are clamped when read through the accessors.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ViewCacheConfig {
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_amount_per_page")]
    pub default_amount_per_page: usize,
}

impl Default for ViewCacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            default_ttl_secs: DEFAULT_TTL_SECS,
            default_amount_per_page: DEFAULT_AMOUNT_PER_PAGE,
        }
    }
}

impl ViewCacheConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|error| ConfigError::Parse { error })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidSweepInterval);
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn ttl(&self) -> Duration {
        clamp_ttl(self.default_ttl_secs)
    }

    pub fn amount_per_page(&self) -> usize {
        clamp_amount_per_page(self.default_amount_per_page)
    }
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_amount_per_page() -> usize {
    DEFAULT_AMOUNT_PER_PAGE
}
