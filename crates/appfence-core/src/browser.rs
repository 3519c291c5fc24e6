//! Browser install policy and site-list application

use appfence_host_api::PolicyLayer;
use appfence_store::RestrictionStore;
use appfence_util::{FenceError, PackageId, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Applies the merged URL blocklist to browsers, and decides what to do with
/// a freshly installed one.
pub struct BrowserPolicy {
    store: Arc<dyn RestrictionStore>,
    policy: Arc<dyn PolicyLayer>,
}

impl BrowserPolicy {
    pub fn new(store: Arc<dyn RestrictionStore>, policy: Arc<dyn PolicyLayer>) -> Self {
        Self { store, policy }
    }

    /// The union of all saved site lists, first occurrence wins
    pub fn merged_blocklist(&self) -> Result<Vec<String>> {
        let lists = self
            .store
            .site_lists()
            .map_err(|e| FenceError::store(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for list in lists {
            for site in list.sites {
                if seen.insert(site.clone()) {
                    merged.push(site);
                }
            }
        }
        Ok(merged)
    }

    /// Re-apply the merged blocklist to every browser that accepts managed
    /// configuration. Per-browser failures are logged, not fatal.
    pub async fn apply_to_all(&self) -> Result<()> {
        let urls = self.merged_blocklist()?;
        let browsers = self
            .policy
            .browser_packages()
            .await
            .map_err(|e| FenceError::host(e.to_string()))?;

        for browser in browsers {
            match self.policy.supports_managed_config(&browser).await {
                Ok(true) => {
                    if let Err(e) = self.policy.apply_url_blocklist(&browser, &urls).await {
                        warn!(package = %browser, error = %e, "Blocklist application failed");
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(package = %browser, error = %e, "Managed-config probe failed");
                }
            }
        }

        info!(url_count = urls.len(), "Browser blocklists re-applied");
        Ok(())
    }

    /// Install-time decision for a new package: apply the blocklist when the
    /// browser accepts managed configuration, otherwise suspend it pending
    /// administrator action. Non-browsers are left alone.
    pub async fn handle_package_added(&self, package: &PackageId) -> Result<()> {
        let is_browser = self
            .policy
            .is_browser(package)
            .await
            .map_err(|e| FenceError::host(e.to_string()))?;
        if !is_browser {
            return Ok(());
        }

        let supports = self
            .policy
            .supports_managed_config(package)
            .await
            .map_err(|e| FenceError::host(e.to_string()))?;

        if supports {
            let urls = self.merged_blocklist()?;
            self.policy
                .apply_url_blocklist(package, &urls)
                .await
                .map_err(|e| FenceError::host(e.to_string()))?;
            info!(package = %package, "New browser received URL blocklist");
        } else {
            self.policy
                .set_suspended(package, true)
                .await
                .map_err(|e| FenceError::host(e.to_string()))?;
            info!(package = %package, "Unmanageable browser suspended");
        }

        Ok(())
    }
}
