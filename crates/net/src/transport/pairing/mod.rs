//! Transfers from a paired device over a short-range link

pub mod wire;

use super::cancellable;
use super::stream::{copy_body, CopyParams};
use crate::session::{FetchReport, Progress, TransferSession};
use fetchr_errors::{Error, NetworkError};
use fetchr_platform::{PairingAdapter, PairingLink};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::io::ReaderStream;
use wire::{read_response_head, Request, ResponseHead};

/// Fetches a path from a paired device
///
/// The device is addressed by its hardware address. Transfers are never
/// resumed: the destination is truncated and the whole body re-sent.
pub struct PairingTransport {
    adapter: Arc<dyn PairingAdapter>,
    address: String,
    session: TransferSession,
    read_timeout: Duration,
}

impl std::fmt::Debug for PairingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingTransport")
            .field("address", &self.address)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl PairingTransport {
    #[must_use]
    pub fn new(
        adapter: Arc<dyn PairingAdapter>,
        address: String,
        session: TransferSession,
        read_timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            address,
            session,
            read_timeout,
        }
    }

    /// Hardware address of the device, `AA:BB:CC:DD:EE:FF`
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    /// Fetch the URL path from the device into the destination
    ///
    /// # Errors
    ///
    /// Returns an unavailable-transport error when the device cannot be
    /// reached, `HttpError` for a non-success status, and an I/O failure when
    /// the body ends early or the link drops.
    pub async fn fetch(
        &mut self,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<FetchReport, Error> {
        self.session.check_cancelled()?;
        let (reader, head) = self.exchange(self.get_request()).await?;

        let len = head
            .content_length()
            .ok_or_else(|| NetworkError::ProtocolViolation {
                message: "response without Content-Length".to_string(),
            })?;

        let destination = self.session.destination().to_path_buf();
        let mut file = tokio::fs::File::create(&destination)
            .await
            .map_err(|e| Error::io_with_path(&e, &destination))?;

        self.session.begin(Some(len), 0);
        let received = copy_body(
            &mut self.session,
            ReaderStream::new(reader.take(len)),
            &mut file,
            CopyParams {
                chunk_timeout: self.read_timeout,
                expected_len: Some(len),
                hasher: None,
            },
            on_progress,
        )
        .await?;

        Ok(FetchReport {
            url: self.session.url().clone(),
            destination,
            kind: self.session.kind(),
            bytes_transferred: received,
            size: received,
            resumed_from: 0,
            not_modified: false,
            cache_tag: head.header("ETag").map(str::to_string),
            hash: None,
        })
    }

    /// Ask the device for the size of the resource without transferring it
    ///
    /// # Errors
    ///
    /// Same failures as [`PairingTransport::fetch`] up to the response head,
    /// plus a protocol violation when the device omits `Content-Length`.
    pub async fn probe_size(&self) -> Result<u64, Error> {
        let request = Request::head(self.session.url().request_target())
            .with_header("Host", self.address.as_str());
        let (_reader, head) = self.exchange(request).await?;
        head.content_length().ok_or_else(|| {
            NetworkError::ProtocolViolation {
                message: "HEAD response without Content-Length".to_string(),
            }
            .into()
        })
    }

    fn get_request(&self) -> Request {
        Request::get(self.session.url().request_target()).with_header("Host", self.address.as_str())
    }

    /// Connect, send `request` and read the response head
    async fn exchange(
        &self,
        request: Request,
    ) -> Result<(BufReader<Box<dyn PairingLink>>, ResponseHead), Error> {
        let cancel = self.session.cancellation_token();

        tracing::debug!(
            address = %self.address,
            target = request.target(),
            "connecting to paired device"
        );
        let mut link = cancellable(&cancel, async {
            self.adapter
                .connect(&self.address)
                .await
                .map_err(Error::from)
        })
        .await?;

        cancellable(&cancel, self.with_timeout(request.write_to(&mut link))).await?;

        let mut reader = BufReader::new(link);
        let head = cancellable(&cancel, self.with_timeout(read_response_head(&mut reader))).await?;

        if !head.is_success() {
            return Err(NetworkError::HttpError {
                status: head.status(),
                message: head.reason().to_string(),
            }
            .into());
        }

        Ok((reader, head))
    }

    async fn with_timeout<T, E>(
        &self,
        operation: impl std::future::Future<Output = Result<T, E>>,
    ) -> Result<T, Error>
    where
        E: Into<Error>,
    {
        match tokio::time::timeout(self.read_timeout, operation).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(NetworkError::Timeout {
                url: self.session.url().to_string(),
            }
            .into()),
        }
    }
}
