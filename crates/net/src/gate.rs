//! Capability gate for the native download facility

use crate::selector::{select, TransportKind};
use crate::source::SourceUrl;

/// First platform release whose native download facility handles HTTPS
pub const MIN_NATIVE_DOWNLOAD_VERSION: u32 = 14;

/// Whether a URL may be handed to the native download facility
///
/// The facility knows nothing about the overlay proxy or pairing links, so
/// only conventional HTTP qualifies, and only on a new enough platform.
#[must_use]
pub fn can_use_native_downloader(url: &SourceUrl, platform_version: u32) -> bool {
    platform_version >= MIN_NATIVE_DOWNLOAD_VERSION
        && select(url) == TransportKind::ConventionalHttp
}
