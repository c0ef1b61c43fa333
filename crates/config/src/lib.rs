#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for fetchr
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/fetchr/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;
pub mod core;

pub use constants::DEFAULT_OVERLAY_PROXY;
pub use self::core::{NetworkConfig, OverlayConfig, PairingConfig, PathConfig, PlatformConfig};

use constants::{
    APP_DIR, CONFIG_FILE, ENV_API_LEVEL, ENV_OVERLAY_PROXY, ENV_SCRATCH_DIR, ENV_TIMEOUT,
};
use fetchr_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub pairing: PairingConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub platform: PlatformConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(dir) = std::env::var(ENV_SCRATCH_DIR) {
            if dir.is_empty() {
                return Err(invalid(ENV_SCRATCH_DIR, dir));
            }
            self.paths.scratch_dir = Some(PathBuf::from(dir));
        }

        if let Ok(proxy) = std::env::var(ENV_OVERLAY_PROXY) {
            if !proxy.contains("://") {
                return Err(invalid(ENV_OVERLAY_PROXY, proxy));
            }
            self.overlay.proxy_url = proxy;
        }

        if let Ok(timeout) = std::env::var(ENV_TIMEOUT) {
            self.network.timeout = timeout.parse().map_err(|_| invalid(ENV_TIMEOUT, timeout))?;
        }

        if let Ok(level) = std::env::var(ENV_API_LEVEL) {
            let parsed = level.parse().map_err(|_| invalid(ENV_API_LEVEL, level))?;
            self.platform.api_level = Some(parsed);
        }

        self.validate()
    }

    /// Reject values that would make every transfer fail
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.network.timeout == 0 {
            return Err(invalid("network.timeout", "0"));
        }
        if self.network.connect_timeout == 0 {
            return Err(invalid("network.connect_timeout", "0"));
        }
        if !self.overlay.proxy_url.contains("://") {
            return Err(invalid("overlay.proxy_url", self.overlay.proxy_url.clone()));
        }
        Ok(())
    }

    /// Get the scratch directory for temporary destinations (with default)
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.paths.scratch_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
        })
    }
}

fn invalid(field: &str, value: impl Into<String>) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.into(),
    }
    .into()
}
