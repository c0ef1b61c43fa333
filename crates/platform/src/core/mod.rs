//! Core platform handle shared by the transfer factory

use std::sync::Arc;

use crate::downloads::NativeDownloadService;
use crate::implementations::headless::NoPairingAdapter;
use crate::pairing::PairingAdapter;

/// Everything the transfer core needs to know about the host
#[derive(Clone)]
pub struct Platform {
    api_level: Option<u32>,
    native_downloads: Option<Arc<dyn NativeDownloadService>>,
    pairing: Arc<dyn PairingAdapter>,
}

impl Platform {
    /// Create a platform handle from explicit collaborators
    pub fn new(
        api_level: Option<u32>,
        native_downloads: Option<Arc<dyn NativeDownloadService>>,
        pairing: Arc<dyn PairingAdapter>,
    ) -> Self {
        Self {
            api_level,
            native_downloads,
            pairing,
        }
    }

    /// A host with neither a native download facility nor a pairing adapter
    #[must_use]
    pub fn headless() -> Self {
        Self::new(None, None, Arc::new(NoPairingAdapter))
    }

    /// Replace the pairing adapter
    #[must_use]
    pub fn with_pairing(mut self, pairing: Arc<dyn PairingAdapter>) -> Self {
        self.pairing = pairing;
        self
    }

    /// Attach a native download facility reporting the given API level
    #[must_use]
    pub fn with_native_downloads(
        mut self,
        api_level: u32,
        service: Arc<dyn NativeDownloadService>,
    ) -> Self {
        self.api_level = Some(api_level);
        self.native_downloads = Some(service);
        self
    }

    /// API level of the host; `None` when the host has no versioned platform
    pub fn api_level(&self) -> Option<u32> {
        self.api_level
    }

    /// Native download facility, if the host has one
    pub fn native_downloads(&self) -> Option<&Arc<dyn NativeDownloadService>> {
        self.native_downloads.as_ref()
    }

    /// Adapter used to open links to paired devices
    pub fn pairing(&self) -> &Arc<dyn PairingAdapter> {
        &self.pairing
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("api_level", &self.api_level)
            .field("native_downloads", &self.native_downloads.is_some())
            .finish_non_exhaustive()
    }
}
