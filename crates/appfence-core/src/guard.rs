//! Anti-disable guard
//!
//! When a system settings sub-screen opens, the daemon snapshots the window's
//! node tree and looks for this service's own settings entry by its
//! descriptive label. A match means the user is one tap away from disabling
//! monitoring, so the guard requests an immediate back navigation.

use appfence_api::UiNode;
use tracing::info;

pub struct DisableGuard {
    service_label: String,
}

impl DisableGuard {
    pub fn new(service_label: impl Into<String>) -> Self {
        Self {
            service_label: service_label.into(),
        }
    }

    /// Whether the tree shows this service's settings entry
    pub fn should_bounce(&self, tree: &UiNode) -> bool {
        let found = Self::has_exact_text(tree, &self.service_label);
        if found {
            info!(label = %self.service_label, "Service settings entry on screen, bouncing");
        }
        found
    }

    fn has_exact_text(node: &UiNode, label: &str) -> bool {
        if node.text.as_deref() == Some(label) {
            return true;
        }
        node.children
            .iter()
            .any(|child| Self::has_exact_text(child, label))
    }
}
