//! Coarse failure classification shared by every transport

use std::fmt;

use crate::{Error, NetworkError, PlatformError};

/// The kind of failure a transfer ended with.
///
/// Callers use this to tell "try again" situations apart from permanent ones
/// without matching on every concrete error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailureKind {
    /// The URL or another input was rejected before any transfer started
    MalformedInput,
    /// Local filesystem or stream I/O failed
    IoFailure,
    /// The device or proxy needed to reach the source could not be reached
    TransportUnavailable,
    /// The remote end answered with a non-success status
    HttpStatus(u16),
    /// The transfer was stopped on request
    Cancelled,
}

impl FailureKind {
    /// Whether re-invoking the same transfer may reasonably succeed
    #[must_use]
    pub fn is_transient(self) -> bool {
        match self {
            Self::IoFailure | Self::TransportUnavailable => true,
            Self::HttpStatus(code) => code >= 500 || code == 408 || code == 429,
            Self::MalformedInput | Self::Cancelled => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedInput => f.write_str("malformed input"),
            Self::IoFailure => f.write_str("I/O failure"),
            Self::TransportUnavailable => f.write_str("transport unavailable"),
            Self::HttpStatus(code) => write!(f, "HTTP status {code}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

impl Error {
    /// Classify this error into the transfer failure taxonomy
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Network(err) => match err {
                NetworkError::HttpError { status, .. } => FailureKind::HttpStatus(*status),
                NetworkError::TransportUnavailable { .. } => FailureKind::TransportUnavailable,
                err if err.is_malformed_input() => FailureKind::MalformedInput,
                _ => FailureKind::IoFailure,
            },
            Error::Platform(err) => match err {
                PlatformError::AdapterUnavailable { .. } | PlatformError::DeviceNotPaired { .. } => {
                    FailureKind::TransportUnavailable
                }
                _ => FailureKind::IoFailure,
            },
            Error::Config(_) => FailureKind::MalformedInput,
            Error::Cancelled => FailureKind::Cancelled,
            Error::Storage(_) | Error::Io { .. } | Error::Internal(_) => FailureKind::IoFailure,
        }
    }
}
