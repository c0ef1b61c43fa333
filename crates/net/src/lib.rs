#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Multi-transport downloads for fetchr
//!
//! A URL is routed to exactly one transport: `bluetooth://` URLs go over a
//! short-range pairing link, `.onion` hosts through the local overlay proxy,
//! and everything else over direct HTTP/HTTPS. [`DownloaderFactory`] builds
//! either a [`Transport`] to await directly or an [`AsyncHandle`] that
//! reports to a [`DownloadListener`], delegating to the platform's native
//! download facility when the capability gate allows it.

mod client;
pub mod destination;
pub mod execution;
mod factory;
pub mod gate;
pub mod selector;
mod session;
mod source;
pub mod transport;

pub use client::{NetClient, NetConfig};
pub use destination::{resolve as resolve_destination, DESTINATION_PREFIX};
pub use execution::{
    AsyncHandle, ChannelListener, DownloadListener, InProcessHandle, ListenerEvent,
    NativeDelegateHandle, SessionState,
};
pub use factory::{DownloadRequest, DownloaderFactory, DEFAULT_NATIVE_POLL_INTERVAL};
pub use gate::{can_use_native_downloader, MIN_NATIVE_DOWNLOAD_VERSION};
pub use selector::{pairing_address, select, TransportKind};
pub use session::{FetchReport, Progress, TerminalOutcome, TransferSession};
pub use source::SourceUrl;
pub use transport::{HttpTransport, OverlayHttpTransport, PairingTransport, Transport};

use fetchr_errors::Error;
use std::path::Path;

/// Parse and validate a URL
///
/// # Errors
///
/// Returns a malformed-input error if `url` is not an absolute URL.
pub fn parse_url(url: &str) -> Result<SourceUrl, Error> {
    SourceUrl::parse(url)
}

/// Build a transport for `url` and run it to completion on the current task
///
/// # Errors
///
/// Returns any build or transfer failure; see [`DownloaderFactory::build`]
/// and [`Transport::fetch`].
pub async fn download_file(
    factory: &DownloaderFactory,
    url: &str,
    dest: Option<&Path>,
) -> Result<FetchReport, Error> {
    let mut transport = factory.build(url, dest)?;
    transport.fetch(|_| {}).await
}
