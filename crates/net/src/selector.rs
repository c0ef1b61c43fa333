//! Transport selection by URL shape

use crate::source::SourceUrl;
use fetchr_errors::{Error, NetworkError};
use std::fmt;

/// Scheme that routes a transfer over a short-range pairing link
pub const PAIRING_SCHEME: &str = "bluetooth";

/// Host suffix of anonymized overlay services
pub const OVERLAY_SUFFIX: &str = ".onion";

/// The medium a transfer moves bytes over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    ShortRangePairing,
    AnonymizedOverlayHttp,
    ConventionalHttp,
}

impl TransportKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShortRangePairing => "pairing",
            Self::AnonymizedOverlayHttp => "overlay",
            Self::ConventionalHttp => "http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the transport for a URL; the first matching rule wins
#[must_use]
pub fn select(url: &SourceUrl) -> TransportKind {
    if url.scheme().eq_ignore_ascii_case(PAIRING_SCHEME) {
        TransportKind::ShortRangePairing
    } else if is_overlay_host(url) {
        TransportKind::AnonymizedOverlayHttp
    } else {
        TransportKind::ConventionalHttp
    }
}

/// Whether the URL names an overlay service; hostless URLs never do
#[must_use]
pub fn is_overlay_host(url: &SourceUrl) -> bool {
    url.host().is_some_and(|host| host.ends_with(OVERLAY_SUFFIX))
}

/// Hardware address of the device behind a pairing URL
///
/// Colons are not legal in a URL host, so addresses travel with `-` in
/// their place: `bluetooth://AA-BB-CC-DD-EE-FF/path`.
///
/// # Errors
///
/// Returns `NetworkError::InvalidPairingAddress` when the host is missing or
/// is not six hex octets.
pub fn pairing_address(url: &SourceUrl) -> Result<String, Error> {
    let host = url.host().unwrap_or_default();
    let address = host.replace('-', ":");

    let octets: Vec<&str> = address.split(':').collect();
    let valid = octets.len() == 6
        && octets
            .iter()
            .all(|octet| octet.len() == 2 && octet.chars().all(|c| c.is_ascii_hexdigit()));

    if !valid {
        return Err(NetworkError::InvalidPairingAddress {
            host: host.to_string(),
        }
        .into());
    }

    Ok(address)
}
