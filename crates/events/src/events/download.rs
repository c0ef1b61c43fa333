use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Download lifecycle events, one stream per transfer session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Transfer started; `transport` names the selected transport kind
    Started {
        url: String,
        transport: String,
        total_bytes: Option<u64>,
    },

    /// A partial destination file is being continued
    Resuming {
        url: String,
        resume_offset: u64,
        total_bytes: Option<u64>,
    },

    /// Bytes written so far
    Progress {
        url: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// Transfer finished and the destination is complete
    Completed { url: String, bytes_downloaded: u64 },

    /// The server confirmed the cached copy is still current
    NotModified { url: String, cache_tag: String },

    /// Transfer ended with an error
    Failed {
        url: String,
        failure: FailureContext,
    },

    /// Transfer stopped on request
    Cancelled { url: String, bytes_downloaded: u64 },

    /// Transfer handed to the platform's native download facility
    DelegatedToNative { url: String, native_id: u64 },
}

impl DownloadEvent {
    /// URL this event refers to
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Started { url, .. }
            | Self::Resuming { url, .. }
            | Self::Progress { url, .. }
            | Self::Completed { url, .. }
            | Self::NotModified { url, .. }
            | Self::Failed { url, .. }
            | Self::Cancelled { url, .. }
            | Self::DelegatedToNative { url, .. } => url,
        }
    }
}
