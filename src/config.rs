//! Service configuration.
//!
//! Loaded from a single TOML file. Every key is optional except that a file
//! which declares `[[sites]]` replaces the built-in registry entirely.
//!
//! ```toml
//! refresh_interval_secs = 5
//! request_timeout_secs = 10
//! history_capacity = 720
//! stale_after_secs = 60
//!
//! [[sites]]
//! id = "NOVACAP"
//! base_url = "https://novacap.example.net"
//! max_power_kw = 150
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::sites::{Site, default_sites};

pub const DEFAULT_CONFIG_PATH: &str = "solmon.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    #[serde(default = "default_sites")]
    pub sites: Vec<Site>,
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// One hour of readings at the default cadence.
fn default_history_capacity() -> usize {
    720
}

fn default_stale_after_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            history_capacity: default_history_capacity(),
            stale_after_secs: default_stale_after_secs(),
            sites: default_sites(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Resolve the configuration the binary should run with.
    ///
    /// An explicitly requested file must exist. Without one, the default path
    /// is tried and the built-in registry is used if it is absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid("refresh_interval_secs must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be positive".into()));
        }
        if self.sites.is_empty() {
            return Err(ConfigError::Invalid("at least one site must be configured".into()));
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if site.id.trim().is_empty() {
                return Err(ConfigError::Invalid("site id must not be empty".into()));
            }
            if !seen.insert(site.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate site id '{}'", site.id)));
            }
            match reqwest::Url::parse(&site.base_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "site '{}' has invalid base_url '{}'",
                        site.id, site.base_url
                    )));
                }
            }
            if !(site.max_power_kw > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "site '{}' must have a positive max_power_kw",
                    site.id
                )));
            }
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}
