//! Network and transport error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("invalid pairing address in host: {host}")]
    InvalidPairingAddress { host: String },

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("length mismatch: expected {expected} bytes, received {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("{transport} transport unavailable: {reason}")]
    TransportUnavailable { transport: String, reason: String },

    #[error("protocol violation: {message}")]
    ProtocolViolation { message: String },

    #[error("native download failed: {reason}")]
    NativeDownloadFailed { reason: String, code: Option<i32> },
}

impl NetworkError {
    /// Shorthand for a transport that could not be reached at all
    pub fn unavailable(transport: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            transport: transport.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status carried by this error, if any
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error originates from rejected input rather than the transfer itself
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::UnsupportedScheme { .. } | Self::InvalidPairingAddress { .. }
        )
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) => {
                Some("Check your network connection and retry.")
            }
            Self::InvalidUrl(_) | Self::UnsupportedScheme { .. } => {
                Some("Check the URL for typos; only http, https and bluetooth URLs are supported.")
            }
            Self::InvalidPairingAddress { .. } => {
                Some("Pairing URLs encode the device address with '-' separators, e.g. bluetooth://AA-BB-CC-DD-EE-FF/path.")
            }
            Self::TransportUnavailable { .. } => Some(
                "Make sure the overlay proxy is running or the device is paired and in range, then retry.",
            ),
            Self::ChecksumMismatch { .. } | Self::LengthMismatch { .. } => {
                Some("The downloaded file was incomplete or corrupted; delete it and retry.")
            }
            Self::HttpError { status, .. } if *status >= 500 => {
                Some("The server reported an internal error; retry later.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::DownloadFailed(_)
            | Self::ConnectionRefused(_)
            | Self::TransportUnavailable { .. }
            | Self::LengthMismatch { .. }
            | Self::NativeDownloadFailed { .. } => true,
            Self::HttpError { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::DownloadFailed(_) => "network.download_failed",
            Self::ConnectionRefused(_) => "network.connection_refused",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::UnsupportedScheme { .. } => "network.unsupported_scheme",
            Self::InvalidPairingAddress { .. } => "network.invalid_pairing_address",
            Self::HttpError { .. } => "network.http_error",
            Self::ChecksumMismatch { .. } => "network.checksum_mismatch",
            Self::LengthMismatch { .. } => "network.length_mismatch",
            Self::TransportUnavailable { .. } => "network.transport_unavailable",
            Self::ProtocolViolation { .. } => "network.protocol_violation",
            Self::NativeDownloadFailed { .. } => "network.native_download_failed",
        };
        Some(code)
    }
}
