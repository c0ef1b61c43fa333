use serde::{Deserialize, Serialize};

use crate::EventSource;
use fetchr_errors::{Error, FailureKind, UserFacingError};

/// Why a transfer failed, flattened for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Failure class, e.g. `transport unavailable` or `HTTP status 404`
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        let kind = error.failure_kind();
        Self {
            kind: kind.to_string(),
            http_status: match kind {
                FailureKind::HttpStatus(status) => Some(status),
                _ => None,
            },
            code: error.user_code().map(str::to_string),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(str::to_string),
            retryable: error.is_retryable(),
        }
    }
}

pub mod download;
pub mod general;

pub use download::*;
pub use general::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Transfer lifecycle events
    Download(DownloadEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::General,
            Self::Download(_) => EventSource::Download,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. })
            | Self::Download(DownloadEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. }) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Download(DownloadEvent::Resuming { .. }) => Level::DEBUG,

            // Progress is emitted per chunk
            Self::Download(DownloadEvent::Progress { .. }) => Level::TRACE,

            _ => Level::INFO,
        }
    }
}
