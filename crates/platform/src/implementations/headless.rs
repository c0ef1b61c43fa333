//! Collaborators for hosts without wireless or native download support

use async_trait::async_trait;
use fetchr_errors::PlatformError;

use crate::pairing::{PairingAdapter, PairingLink};

/// Pairing adapter for hosts without a short-range radio
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPairingAdapter;

#[async_trait]
impl PairingAdapter for NoPairingAdapter {
    async fn connect(&self, address: &str) -> Result<Box<dyn PairingLink>, PlatformError> {
        Err(PlatformError::AdapterUnavailable {
            message: format!("no pairing adapter on this host (requested {address})"),
        })
    }
}
