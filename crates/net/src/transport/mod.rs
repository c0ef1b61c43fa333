//! Transports: one strategy per medium, chosen once by the selector

pub mod http;
pub mod overlay;
pub mod pairing;
pub(crate) mod resume;
pub(crate) mod stream;

pub use http::HttpTransport;
pub use overlay::OverlayHttpTransport;
pub use pairing::PairingTransport;

use crate::selector::TransportKind;
use crate::session::{FetchReport, Progress, TransferSession};
use crate::source::SourceUrl;
use fetchr_errors::Error;
use std::future::Future;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// A ready-to-run transfer over one of the supported media
#[derive(Debug)]
pub enum Transport {
    Pairing(PairingTransport),
    Overlay(OverlayHttpTransport),
    Http(HttpTransport),
}

impl Transport {
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        self.session().kind()
    }

    #[must_use]
    pub fn session(&self) -> &TransferSession {
        match self {
            Self::Pairing(transport) => transport.session(),
            Self::Overlay(transport) => transport.session(),
            Self::Http(transport) => transport.session(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &SourceUrl {
        self.session().url()
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        self.session().destination()
    }

    /// Token that stops the transfer when cancelled, from any task
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.session().cancellation_token()
    }

    /// Send a cache tag with HTTP requests; pairing links ignore it
    #[must_use]
    pub fn with_cache_tag(self, tag: impl Into<String>) -> Self {
        match self {
            Self::Http(transport) => Self::Http(transport.with_cache_tag(tag)),
            Self::Overlay(transport) => Self::Overlay(transport.with_cache_tag(tag)),
            pairing @ Self::Pairing(_) => pairing,
        }
    }

    /// Require the finished file to have this BLAKE3 hex digest (HTTP only)
    #[must_use]
    pub fn with_expected_hash(self, hex: impl Into<String>) -> Self {
        match self {
            Self::Http(transport) => Self::Http(transport.with_expected_hash(hex)),
            Self::Overlay(transport) => Self::Overlay(transport.with_expected_hash(hex)),
            pairing @ Self::Pairing(_) => pairing,
        }
    }

    /// Run the transfer on the current task, calling `on_progress` as bytes land
    ///
    /// # Errors
    ///
    /// Returns the transfer failure, or `Error::Cancelled` once the session's
    /// token is cancelled.
    pub async fn fetch<F>(&mut self, mut on_progress: F) -> Result<FetchReport, Error>
    where
        F: FnMut(Progress) + Send,
    {
        let result = match self {
            Self::Pairing(transport) => transport.fetch(&mut on_progress).await,
            Self::Overlay(transport) => transport.fetch(&mut on_progress).await,
            Self::Http(transport) => transport.fetch(&mut on_progress).await,
        };
        let result = self.session().settle(result);

        match &result {
            Ok(report) => tracing::debug!(
                url = %report.url,
                transport = %report.kind,
                bytes = report.bytes_transferred,
                not_modified = report.not_modified,
                "transfer complete"
            ),
            Err(err) => tracing::debug!(
                url = %self.url(),
                failure = %err.failure_kind(),
                error = %err,
                "transfer ended without success"
            ),
        }
        self.session().emit_outcome(&result);
        result
    }
}

/// Resolve to `Error::Cancelled` as soon as `token` fires
pub(crate) async fn cancellable<T, F>(token: &CancellationToken, operation: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::Cancelled),
        result = operation => result,
    }
}
