//! Configuration sections, one per transport plus paths and platform facts

use crate::constants::{
    DEFAULT_CHUNK_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_OVERLAY_CONNECT_TIMEOUT_SECS,
    DEFAULT_OVERLAY_PROXY, DEFAULT_PAIRING_READ_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Direct HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    /// Longest wait for the next body chunk
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    #[must_use]
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout)
    }
}

/// Anonymizing overlay network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_overlay_proxy")]
    pub proxy_url: String,
    #[serde(default = "default_overlay_connect_timeout")]
    pub connect_timeout: u64, // seconds
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            proxy_url: default_overlay_proxy(),
            connect_timeout: DEFAULT_OVERLAY_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Short-range pairing transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingConfig {
    #[serde(default = "default_pairing_read_timeout")]
    pub read_timeout: u64, // seconds
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_PAIRING_READ_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Where destinations are created when the caller names none
    pub scratch_dir: Option<PathBuf>,
}

/// Host platform facts
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlatformConfig {
    /// API level of the host platform; `None` means no native download facility
    pub api_level: Option<u32>,
}

// Default value functions for serde
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_chunk_timeout() -> u64 {
    DEFAULT_CHUNK_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("fetchr/{}", env!("CARGO_PKG_VERSION"))
}

fn default_overlay_proxy() -> String {
    DEFAULT_OVERLAY_PROXY.to_string()
}

fn default_overlay_connect_timeout() -> u64 {
    DEFAULT_OVERLAY_CONNECT_TIMEOUT_SECS
}

fn default_pairing_read_timeout() -> u64 {
    DEFAULT_PAIRING_READ_TIMEOUT_SECS
}
