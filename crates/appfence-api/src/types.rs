//! Shared protocol data types

use appfence_util::{ListId, PackageId};
use serde::{Deserialize, Serialize};

/// A full-screen blocking page the host must present.
///
/// The page carries the package identifier; the host resolves the
/// human-readable label and falls back to the raw identifier when the
/// package cannot be resolved (e.g. uninstalled mid-session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockPage {
    /// Daily budget exhausted
    TimeUp {
        package: PackageId,
        limit_minutes: u32,
    },

    /// Reopen cooldown still running. The page counts `remaining_seconds`
    /// down once per second and closes the blocked package's whole task
    /// stack when it reaches zero.
    Cooldown {
        package: PackageId,
        remaining_seconds: u32,
    },
}

impl BlockPage {
    pub fn package(&self) -> &PackageId {
        match self {
            BlockPage::TimeUp { package, .. } | BlockPage::Cooldown { package, .. } => package,
        }
    }
}

/// A named, ordered list of blocked sites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteList {
    pub id: ListId,
    pub title: String,
    pub sites: Vec<String>,
}

impl SiteList {
    pub fn new(title: impl Into<String>, sites: Vec<String>) -> Self {
        Self {
            id: ListId::generate(),
            title: title.into(),
            sites,
        }
    }
}

/// One entry of the bounded recent-activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub package: PackageId,
    pub class_name: String,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_page_roundtrip() {
        let page = BlockPage::Cooldown {
            package: PackageId::new("org.example.game"),
            remaining_seconds: 42,
        };

        let json = serde_json::to_string(&page).unwrap();
        let parsed: BlockPage = serde_json::from_str(&json).unwrap();
        assert_eq!(page, parsed);
    }

    #[test]
    fn site_list_gets_fresh_id() {
        let a = SiteList::new("Social", vec!["example.com".into()]);
        let b = SiteList::new("Social", vec!["example.com".into()]);
        assert_ne!(a.id, b.id);
    }
}
