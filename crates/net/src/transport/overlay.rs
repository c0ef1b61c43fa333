//! HTTP routed through the local anonymizing overlay proxy

use super::http::HttpTransport;
use crate::client::NetClient;
use crate::session::{FetchReport, Progress, TransferSession};
use fetchr_errors::Error;
use std::time::Duration;

/// Conventional HTTP semantics, every request sent through the overlay proxy
///
/// Name resolution happens inside the overlay, so `.onion` hosts never touch
/// the local resolver. A proxy that refuses connections surfaces as an
/// unavailable transport.
#[derive(Debug)]
pub struct OverlayHttpTransport {
    inner: HttpTransport,
}

impl OverlayHttpTransport {
    /// `client` must have been built with the overlay proxy configured
    #[must_use]
    pub fn new(client: NetClient, session: TransferSession, chunk_timeout: Duration) -> Self {
        debug_assert!(client.proxy().is_some(), "overlay client without proxy");
        Self {
            inner: HttpTransport::new(client, session, chunk_timeout),
        }
    }

    #[must_use]
    pub fn with_cache_tag(self, tag: impl Into<String>) -> Self {
        Self {
            inner: self.inner.with_cache_tag(tag),
        }
    }

    #[must_use]
    pub fn with_expected_hash(self, hex: impl Into<String>) -> Self {
        Self {
            inner: self.inner.with_expected_hash(hex),
        }
    }

    #[must_use]
    pub fn session(&self) -> &TransferSession {
        self.inner.session()
    }

    /// # Errors
    ///
    /// Same as [`HttpTransport::fetch`].
    pub async fn fetch(
        &mut self,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<FetchReport, Error> {
        self.inner.fetch(on_progress).await
    }
}
