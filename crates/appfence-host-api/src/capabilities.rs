//! Host capabilities model

use serde::{Deserialize, Serialize};

/// Describes what a platform host can do
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Can present a full-screen block page over another app
    pub can_launch_block_page: bool,

    /// Can perform a global back navigation
    pub can_navigate_back: bool,

    /// Can read the active window's node tree (anti-disable guard)
    pub can_observe_node_tree: bool,

    /// Can push managed configuration to browsers
    pub can_manage_browser_config: bool,

    /// Can suspend packages (optional)
    pub can_suspend_packages: bool,

    /// Can hide packages from the launcher (optional)
    pub can_hide_packages: bool,

    /// Can block package uninstallation (optional)
    pub can_block_uninstall: bool,
}

impl HostCapabilities {
    /// Minimal capabilities: enforcement only, no policy layer
    pub fn minimal() -> Self {
        Self {
            can_launch_block_page: true,
            can_navigate_back: true,
            can_observe_node_tree: false,
            can_manage_browser_config: false,
            can_suspend_packages: false,
            can_hide_packages: false,
            can_block_uninstall: false,
        }
    }

    /// Full capabilities: device-owner deployments
    pub fn full() -> Self {
        Self {
            can_launch_block_page: true,
            can_navigate_back: true,
            can_observe_node_tree: true,
            can_manage_browser_config: true,
            can_suspend_packages: true,
            can_hide_packages: true,
            can_block_uninstall: true,
        }
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::minimal()
    }
}
