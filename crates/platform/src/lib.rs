//! Platform abstraction layer for transfer collaborators.
//!
//! This crate describes what the host platform offers to the transfer core:
//! - The platform API level, used to decide whether the native download
//!   facility can be trusted with a URL
//! - The native background download facility (submit, query, cancel)
//! - The short-range pairing adapter (connect to a paired device by address)
//!
//! Hosts without one of these facilities use the headless implementations.

pub mod core;
pub mod downloads;
pub mod implementations;
pub mod pairing;

pub use core::Platform;
pub use implementations::headless::NoPairingAdapter;

/// Re-export commonly used types
pub use downloads::{
    NativeDownloadId, NativeDownloadRequest, NativeDownloadService, NativeDownloadState,
    NativeDownloadStatus,
};
pub use pairing::{PairingAdapter, PairingLink};
