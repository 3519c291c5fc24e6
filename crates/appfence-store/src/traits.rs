//! Store trait definitions

use appfence_api::SiteList;
use appfence_util::{ListId, PackageId};
use chrono::NaiveDate;

use crate::StoreResult;

/// Main restriction store trait
pub trait RestrictionStore: Send + Sync {
    // Daily limits

    /// Get the daily limit for a package in minutes, if one is set
    fn limit_minutes(&self, package: &PackageId) -> StoreResult<Option<u32>>;

    /// Set the daily limit for a package; `minutes == 0` clears it
    fn set_limit_minutes(&self, package: &PackageId, minutes: u32) -> StoreResult<()>;

    // Usage ledger

    /// Milliseconds of foreground use accrued today
    fn used_millis(&self, package: &PackageId) -> StoreResult<u64>;

    /// Accrue foreground use for a package
    fn add_used_millis(&self, package: &PackageId, delta: u64) -> StoreResult<()>;

    /// Wipe all usage counters (daily reset)
    fn clear_all_usage(&self) -> StoreResult<()>;

    /// The day the ledger was last reset for
    fn last_reset_day(&self) -> StoreResult<Option<NaiveDate>>;

    fn set_last_reset_day(&self, day: NaiveDate) -> StoreResult<()>;

    // Reopen cooldowns

    /// Get the reopen cooldown for a package in seconds, if one is set
    fn reopen_seconds(&self, package: &PackageId) -> StoreResult<Option<u32>>;

    /// Set the reopen cooldown for a package; `seconds == 0` clears it
    fn set_reopen_seconds(&self, package: &PackageId, seconds: u32) -> StoreResult<()>;

    // Activity blocker

    fn blocked_activities(&self) -> StoreResult<Vec<String>>;

    fn set_activity_blocked(&self, class_name: &str, blocked: bool) -> StoreResult<()>;

    fn activity_blocker_enabled(&self) -> StoreResult<bool>;

    fn set_activity_blocker_enabled(&self, enabled: bool) -> StoreResult<()>;

    // Recovery passphrase

    /// Hex-encoded SHA-256 hash of the recovery passphrase, if configured
    fn recovery_hash(&self) -> StoreResult<Option<String>>;

    fn set_recovery_hash(&self, hash: &str) -> StoreResult<()>;

    // Browser site lists

    /// All saved site lists. Malformed records are skipped with a warning
    /// rather than failing the whole load.
    fn site_lists(&self) -> StoreResult<Vec<SiteList>>;

    fn save_site_list(&self, list: &SiteList) -> StoreResult<()>;

    fn remove_site_list(&self, id: &ListId) -> StoreResult<()>;

    // Health

    /// Check if the store is healthy
    fn is_healthy(&self) -> bool;
}
