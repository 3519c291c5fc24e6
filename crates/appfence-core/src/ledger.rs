//! Daily usage ledger

use appfence_store::RestrictionStore;
use appfence_util::{FenceError, PackageId, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Write-through cache over the persisted per-app usage counters.
///
/// Usage accrues in milliseconds and is wiped as a whole when the calendar
/// day changes. The day check runs lazily on foreground changes, never from
/// a background timer.
pub struct UsageLedger {
    store: Arc<dyn RestrictionStore>,
    cache: HashMap<PackageId, u64>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn RestrictionStore>) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    /// Milliseconds of foreground use accrued today
    pub fn used_millis(&mut self, package: &PackageId) -> Result<u64> {
        if let Some(millis) = self.cache.get(package) {
            return Ok(*millis);
        }

        let millis = self
            .store
            .used_millis(package)
            .map_err(|e| FenceError::store(e.to_string()))?;
        self.cache.insert(package.clone(), millis);
        Ok(millis)
    }

    /// Accrue foreground use. Negative deltas are rejected.
    pub fn add_usage(&mut self, package: &PackageId, delta_millis: i64) -> Result<()> {
        if delta_millis < 0 {
            return Err(FenceError::validation(format!(
                "Negative usage delta for {package}: {delta_millis}"
            )));
        }

        let delta = delta_millis as u64;
        let current = self.used_millis(package)?;
        self.store
            .add_used_millis(package, delta)
            .map_err(|e| FenceError::store(e.to_string()))?;
        self.cache.insert(package.clone(), current + delta);

        debug!(package = %package, delta_ms = delta, total_ms = current + delta, "Usage flushed");
        Ok(())
    }

    /// Wipe all usage if the stored reset marker is not `today`.
    /// Returns whether a reset happened.
    pub fn reset_if_new_day(&mut self, today: NaiveDate) -> Result<bool> {
        let last = self
            .store
            .last_reset_day()
            .map_err(|e| FenceError::store(e.to_string()))?;

        if last == Some(today) {
            return Ok(false);
        }

        self.store
            .clear_all_usage()
            .map_err(|e| FenceError::store(e.to_string()))?;
        self.store
            .set_last_reset_day(today)
            .map_err(|e| FenceError::store(e.to_string()))?;
        self.cache.clear();

        info!(day = %today, "Usage ledger reset for new day");
        Ok(true)
    }
}
