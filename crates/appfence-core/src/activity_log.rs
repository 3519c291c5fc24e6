//! Bounded, deduplicating recent-activity log

use appfence_api::ActivityLogEntry;
use appfence_util::PackageId;
use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// Default capacity of the recent-activity log
pub const ACTIVITY_LOG_CAPACITY: usize = 100;

/// Ring of recently seen activities, newest first.
///
/// Deduplicated by (package, class name): re-access moves the entry to the
/// front instead of growing the log. Once full, inserting a new distinct
/// entry evicts the oldest.
#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<ActivityLogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an activity access, newest first
    pub fn record(
        &mut self,
        package: PackageId,
        class_name: impl Into<String>,
        timestamp: DateTime<Local>,
    ) {
        let class_name = class_name.into();
        self.entries
            .retain(|e| !(e.package == package && e.class_name == class_name));
        self.entries.push_front(ActivityLogEntry {
            package,
            class_name,
            timestamp,
        });
        self.entries.truncate(self.capacity);
    }

    /// Snapshot of the log, newest first
    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
