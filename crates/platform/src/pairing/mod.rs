//! Short-range pairing links

use async_trait::async_trait;
use fetchr_errors::PlatformError;
use tokio::io::{AsyncRead, AsyncWrite};

/// A connected, bidirectional byte stream to a paired device
pub trait PairingLink: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> PairingLink for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Opens links to devices that were paired beforehand
#[async_trait]
pub trait PairingAdapter: Send + Sync {
    /// Connect to the device with the given hardware address (`AA:BB:CC:DD:EE:FF`)
    ///
    /// Returns `PlatformError::DeviceNotPaired` when the device is unknown or
    /// out of range and `PlatformError::AdapterUnavailable` when the local
    /// adapter is off or missing.
    async fn connect(&self, address: &str) -> Result<Box<dyn PairingLink>, PlatformError>;
}
