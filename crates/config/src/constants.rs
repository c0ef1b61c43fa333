//! Fixed values behind the configurable defaults

/// Local HTTP proxy exposed by the overlay network client
pub const DEFAULT_OVERLAY_PROXY: &str = "http://127.0.0.1:8118";

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 30;
/// Overlay circuits take a while to build
pub const DEFAULT_OVERLAY_CONNECT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PAIRING_READ_TIMEOUT_SECS: u64 = 60;

/// Directory under the platform config and cache dirs
pub const APP_DIR: &str = "fetchr";
pub const CONFIG_FILE: &str = "config.toml";

pub const ENV_SCRATCH_DIR: &str = "FETCHR_SCRATCH_DIR";
pub const ENV_OVERLAY_PROXY: &str = "FETCHR_OVERLAY_PROXY";
pub const ENV_TIMEOUT: &str = "FETCHR_TIMEOUT";
pub const ENV_API_LEVEL: &str = "FETCHR_API_LEVEL";
