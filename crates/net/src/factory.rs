//! Builds transports and async sessions from URLs

use crate::client::{NetClient, NetConfig};
use crate::destination;
use crate::execution::{in_process, native, AsyncHandle, DownloadListener};
use crate::gate::can_use_native_downloader;
use crate::selector::{pairing_address, select, TransportKind};
use crate::session::TransferSession;
use crate::source::SourceUrl;
use crate::transport::{HttpTransport, OverlayHttpTransport, PairingTransport, Transport};
use fetchr_config::Config;
use fetchr_errors::{Error, NetworkError, StorageError};
use fetchr_events::EventSender;
use fetchr_platform::{NativeDownloadRequest, Platform};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default interval between native facility status queries
pub const DEFAULT_NATIVE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Caller metadata for an async transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Shown by the native facility while it works
    pub title: String,
    /// Caller's identifier; doubles as the event correlation id
    pub id: String,
}

impl DownloadRequest {
    #[must_use]
    pub fn new(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
        }
    }
}

/// Entry point for every transfer
#[derive(Debug, Clone)]
pub struct DownloaderFactory {
    platform: Platform,
    direct: NetClient,
    overlay: NetClient,
    scratch_dir: PathBuf,
    chunk_timeout: Duration,
    pairing_read_timeout: Duration,
    events: Option<EventSender>,
    native_poll_interval: Duration,
}

impl DownloaderFactory {
    /// Create a factory for the given configuration and host platform
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be built, typically
    /// because the overlay proxy URL is invalid.
    pub fn new(config: &Config, platform: Platform) -> Result<Self, Error> {
        Ok(Self {
            platform,
            direct: NetClient::new(NetConfig::direct(config))?,
            overlay: NetClient::new(NetConfig::overlay(config))?,
            scratch_dir: config.scratch_dir(),
            chunk_timeout: config.network.chunk_timeout(),
            pairing_read_timeout: Duration::from_secs(config.pairing.read_timeout),
            events: None,
            native_poll_interval: DEFAULT_NATIVE_POLL_INTERVAL,
        })
    }

    /// Emit lifecycle events for every session built from now on
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn with_native_poll_interval(mut self, interval: Duration) -> Self {
        self.native_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Build a transport for `url`, writing to `destination` or to a fresh
    /// scratch file
    ///
    /// The URL is parsed and its transport selected before any file is
    /// created, so malformed input never leaves a scratch file behind.
    ///
    /// # Errors
    ///
    /// Returns a malformed-input error for unparseable URLs and pairing hosts
    /// that are not hardware addresses, and a storage error if the scratch
    /// destination cannot be created.
    pub fn build(&self, url: &str, destination: Option<&Path>) -> Result<Transport, Error> {
        let source = SourceUrl::parse(url)?;
        self.build_transport(source, destination, None)
    }

    /// Start an async transfer for `url`
    ///
    /// URLs the capability gate accepts go to the native download facility
    /// when the platform has one; everything else runs in-process. Must be
    /// called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Same as [`DownloaderFactory::build`]. Once the handle is returned,
    /// failures are reported only through `listener`.
    pub fn build_async(
        &self,
        url: &str,
        destination: Option<&Path>,
        request: DownloadRequest,
        listener: Arc<dyn DownloadListener>,
    ) -> Result<AsyncHandle, Error> {
        let source = SourceUrl::parse(url)?;
        route(&source)?;

        if let (Some(level), Some(service)) =
            (self.platform.api_level(), self.platform.native_downloads())
        {
            if can_use_native_downloader(&source, level) {
                let destination = self.destination_or_scratch(destination)?;
                let native_request = NativeDownloadRequest {
                    url: source.as_url().clone(),
                    destination: destination.clone(),
                    title: request.title,
                    id: request.id.clone(),
                };
                let session = self.session(
                    source,
                    destination,
                    TransportKind::ConventionalHttp,
                    Some(request.id),
                );
                tracing::info!(
                    url = %session.url(),
                    api_level = level,
                    "using native download facility"
                );
                return Ok(AsyncHandle::NativeDelegate(native::spawn(
                    Arc::clone(service),
                    native_request,
                    session,
                    listener,
                    self.native_poll_interval,
                )));
            }
        }

        let transport = self.build_transport(source, destination, Some(request.id))?;
        Ok(AsyncHandle::InProcess(in_process::spawn(transport, listener)))
    }

    fn build_transport(
        &self,
        source: SourceUrl,
        destination: Option<&Path>,
        correlation_id: Option<String>,
    ) -> Result<Transport, Error> {
        let (kind, address) = route(&source)?;
        let destination = self.destination_or_scratch(destination)?;

        tracing::debug!(
            url = %source,
            transport = %kind,
            destination = %destination.display(),
            "building transport"
        );
        let session = self.session(source, destination, kind, correlation_id);

        Ok(match address {
            Some(address) => Transport::Pairing(PairingTransport::new(
                Arc::clone(self.platform.pairing()),
                address,
                session,
                self.pairing_read_timeout,
            )),
            None if kind == TransportKind::AnonymizedOverlayHttp => Transport::Overlay(
                OverlayHttpTransport::new(self.overlay.clone(), session, self.chunk_timeout),
            ),
            None => Transport::Http(HttpTransport::new(
                self.direct.clone(),
                session,
                self.chunk_timeout,
            )),
        })
    }

    fn session(
        &self,
        source: SourceUrl,
        destination: PathBuf,
        kind: TransportKind,
        correlation_id: Option<String>,
    ) -> TransferSession {
        let session = TransferSession::new(source, destination, kind);
        match &self.events {
            Some(events) => session.with_events(events.clone(), correlation_id),
            None => session,
        }
    }

    fn destination_or_scratch(&self, destination: Option<&Path>) -> Result<PathBuf, Error> {
        if let Some(destination) = destination {
            return Ok(destination.to_path_buf());
        }
        std::fs::create_dir_all(&self.scratch_dir)
            .map_err(|e| StorageError::from_io_with_path(&e, &self.scratch_dir))?;
        destination::resolve(&self.scratch_dir)
    }
}

/// Select the transport and check the URL is usable with it
fn route(source: &SourceUrl) -> Result<(TransportKind, Option<String>), Error> {
    let kind = select(source);
    match kind {
        TransportKind::ShortRangePairing => Ok((kind, Some(pairing_address(source)?))),
        _ if matches!(source.scheme(), "http" | "https") => Ok((kind, None)),
        _ => Err(NetworkError::UnsupportedScheme {
            scheme: source.scheme().to_string(),
        }
        .into()),
    }
}
