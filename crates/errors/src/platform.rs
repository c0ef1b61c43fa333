//! Errors raised by platform collaborators

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors that can occur while talking to platform services
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PlatformError {
    #[error("pairing adapter unavailable: {message}")]
    AdapterUnavailable { message: String },

    #[error("device {address} is not paired or out of range")]
    DeviceNotPaired { address: String },

    #[error("native download service rejected request: {message}")]
    NativeRequestRejected { message: String },

    #[error("unknown native download: {id}")]
    UnknownNativeDownload { id: u64 },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AdapterUnavailable { .. } => Some("Turn on the wireless adapter and retry."),
            Self::DeviceNotPaired { .. } => {
                Some("Pair with the other device and keep it in range, then retry.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AdapterUnavailable { .. } | Self::DeviceNotPaired { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::AdapterUnavailable { .. } => "platform.adapter_unavailable",
            Self::DeviceNotPaired { .. } => "platform.device_not_paired",
            Self::NativeRequestRejected { .. } => "platform.native_request_rejected",
            Self::UnknownNativeDownload { .. } => "platform.unknown_native_download",
        };
        Some(code)
    }
}
