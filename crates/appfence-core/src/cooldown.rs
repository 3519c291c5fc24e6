//! Reopen cooldown tracking

use appfence_store::RestrictionStore;
use appfence_util::{FenceError, MonotonicInstant, PackageId, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Tracks when blocked packages were last closed and computes the remaining
/// lockout before they may be reopened.
///
/// Close times live in process memory on the monotonic clock; they are
/// deliberately not persisted, so a reboot clears all cooldowns. The
/// configured durations come from the store.
pub struct CooldownTracker {
    store: Arc<dyn RestrictionStore>,
    last_closed: HashMap<PackageId, MonotonicInstant>,
}

impl CooldownTracker {
    pub fn new(store: Arc<dyn RestrictionStore>) -> Self {
        Self {
            store,
            last_closed: HashMap::new(),
        }
    }

    /// Seconds of lockout left, floored at 0. Returns 0 when the package has
    /// no cooldown configured or has never been closed.
    pub fn seconds_remaining(&self, package: &PackageId, now: MonotonicInstant) -> Result<u32> {
        let reopen_seconds = self
            .store
            .reopen_seconds(package)
            .map_err(|e| FenceError::store(e.to_string()))?
            .unwrap_or(0);

        if reopen_seconds == 0 {
            return Ok(0);
        }

        let Some(closed_at) = self.last_closed.get(package) else {
            return Ok(0);
        };

        let elapsed = now.duration_since(*closed_at).as_secs();
        if elapsed <= reopen_seconds as u64 {
            Ok(reopen_seconds.saturating_sub(elapsed as u32))
        } else {
            Ok(0)
        }
    }

    /// Record the close time, but only when no residual cooldown is owed at
    /// this moment. The cooldown clock starts when a package is left clean,
    /// not at every backgrounding.
    pub fn record_close_if_clean(
        &mut self,
        package: &PackageId,
        now: MonotonicInstant,
    ) -> Result<bool> {
        if self.seconds_remaining(package, now)? != 0 {
            return Ok(false);
        }

        self.last_closed.insert(package.clone(), now);
        debug!(package = %package, "Cooldown close time recorded");
        Ok(true)
    }
}
