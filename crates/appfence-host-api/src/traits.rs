//! Platform host traits

use appfence_api::BlockPage;
use appfence_util::PackageId;
use async_trait::async_trait;
use thiserror::Error;

use crate::HostCapabilities;

/// Errors from host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Launch failed: {0}")]
    LaunchFailed(String),

    #[error("Package not found: {0}")]
    PackageNotFound(PackageId),

    #[error("Unsupported on this host")]
    Unsupported,

    #[error("Not connected to platform shim")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Enforcement surface of the platform.
///
/// Implemented by the bridge to the platform shim, and by `MockHost` in
/// tests. All methods are fire-toward-the-platform; confirmation comes back
/// as platform events, not return values.
#[async_trait]
pub trait PlatformHost: Send + Sync {
    fn capabilities(&self) -> &HostCapabilities;

    /// Resolve a package's display label, if known
    fn app_label(&self, package: &PackageId) -> Option<String>;

    /// Present a full-screen block page over the offending app
    async fn launch_block_page(&self, page: BlockPage) -> HostResult<()>;

    /// Perform a global back navigation
    async fn navigate_back(&self) -> HostResult<()>;

    /// Show a transient notice to the user
    async fn show_notice(&self, message: &str) -> HostResult<()>;
}

/// Device-policy surface of the platform.
///
/// Only available on device-owner deployments; every call may fail with
/// `HostError::Unsupported`.
#[async_trait]
pub trait PolicyLayer: Send + Sync {
    /// Whether a package is a known browser
    async fn is_browser(&self, package: &PackageId) -> HostResult<bool>;

    /// All installed browser packages
    async fn browser_packages(&self) -> HostResult<Vec<PackageId>>;

    /// Whether a browser accepts managed configuration (URL blocklists)
    async fn supports_managed_config(&self, package: &PackageId) -> HostResult<bool>;

    /// Push the merged URL blocklist to a managed browser
    async fn apply_url_blocklist(&self, package: &PackageId, urls: &[String]) -> HostResult<()>;

    async fn set_suspended(&self, package: &PackageId, suspended: bool) -> HostResult<()>;

    async fn set_hidden(&self, package: &PackageId, hidden: bool) -> HostResult<()>;

    async fn set_uninstall_blocked(&self, package: &PackageId, blocked: bool) -> HostResult<()>;
}
