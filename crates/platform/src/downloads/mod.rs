//! Native background download facility

use async_trait::async_trait;
use fetchr_errors::PlatformError;
use std::path::PathBuf;
use url::Url;

/// Identifier handed out by the native facility for a submitted download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeDownloadId(pub u64);

/// What the native facility is asked to fetch
#[derive(Debug, Clone)]
pub struct NativeDownloadRequest {
    pub url: Url,
    pub destination: PathBuf,
    /// Human readable title shown by the facility
    pub title: String,
    /// Caller's identifier for the thing being downloaded
    pub id: String,
}

/// Lifecycle state reported by the native facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeDownloadState {
    Pending,
    Running,
    /// Waiting for connectivity or retrying internally
    Paused,
    Successful,
    /// Facility-specific reason code; HTTP statuses are passed through as-is
    Failed { reason: i32 },
}

/// Snapshot of a native download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeDownloadStatus {
    pub state: NativeDownloadState,
    pub bytes_so_far: u64,
    pub total_bytes: Option<u64>,
}

/// Client for the platform's background download service
#[async_trait]
pub trait NativeDownloadService: Send + Sync {
    /// Queue a download; the facility writes directly to `request.destination`
    async fn submit(&self, request: NativeDownloadRequest)
        -> Result<NativeDownloadId, PlatformError>;

    /// Current status of a previously submitted download
    async fn query(&self, id: NativeDownloadId) -> Result<NativeDownloadStatus, PlatformError>;

    /// Remove a download from the facility, stopping it if still running
    async fn cancel(&self, id: NativeDownloadId) -> Result<(), PlatformError>;
}
