//! Platform events delivered by the shim

use appfence_util::PackageId;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::UiNode;

/// Kind of an accessibility notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A window came to the foreground
    WindowStateChanged,
    /// Content inside the current window changed (ignored by the engine)
    WindowContentChanged,
}

/// A single event from the platform's accessibility/window-focus stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Foreground/window notification
    Window {
        package: PackageId,
        class_name: String,
        kind: EventKind,
        timestamp: DateTime<Local>,
    },

    /// A system settings sub-screen opened. The shim snapshots the window's
    /// node tree so the daemon can look for its own settings entry
    /// (anti-disable guard).
    SettingsPaneOpened { tree: UiNode },

    /// A package finished installing
    PackageAdded { package: PackageId },

    /// Display labels for installed packages, pushed on connect and after
    /// package changes
    PackageLabels { labels: Vec<(PackageId, String)> },

    /// Installed browsers and whether each accepts managed configuration,
    /// pushed on connect and after package changes
    BrowserInventory { browsers: Vec<BrowserInfo> },
}

/// One installed browser as reported by the shim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub package: PackageId,
    pub supports_managed_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_event_roundtrip() {
        let ev = PlatformEvent::Window {
            package: PackageId::new("org.example.game"),
            class_name: "org.example.game.MainActivity".into(),
            kind: EventKind::WindowStateChanged,
            timestamp: Local::now(),
        };

        let json = serde_json::to_string(&ev).unwrap();
        let parsed: PlatformEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, PlatformEvent::Window { .. }));
    }
}
