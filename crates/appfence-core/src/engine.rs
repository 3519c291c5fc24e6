//! Limit scheduler state machine
//!
//! One foreground package is tracked at a time. Entering a package evaluates
//! its budget and either blocks immediately (budget exhausted), blocks for
//! the remaining cooldown, arms a single deferred block timer, or runs free.
//! Leaving a package flushes the elapsed session into the usage ledger
//! exactly once.
//!
//! The deferred timer is guarded by a generation counter: any transition
//! that leaves the tracked package bumps the generation, so a timer that
//! fires late for a package the user already left is a no-op.

use appfence_api::BlockPage;
use appfence_store::RestrictionStore;
use appfence_util::{MonotonicInstant, PackageId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{ActivityLog, CooldownTracker, Effect, EngineEvent, UsageLedger};

/// Scheduler phase for the tracked package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No tracked package
    Idle,
    /// Foreground package under its limit or unlimited
    Tracking,
    /// Daily budget exhausted, block page shown
    BlockedTimeUp,
    /// Reopen cooldown running, cooldown page shown
    BlockedCooldown,
}

/// The active foreground session.
///
/// Survives the blocked phases: the block page belongs to the engine's own
/// package, so usage keeps accruing against the blocked app until the user
/// actually leaves it.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    pub package: PackageId,
    pub started_at: MonotonicInstant,
}

/// The limit scheduler reducer
pub struct LimitEngine {
    own_package: PackageId,
    store: Arc<dyn RestrictionStore>,
    ledger: UsageLedger,
    cooldown: CooldownTracker,
    activity_log: Arc<Mutex<ActivityLog>>,
    current: Option<TrackingSession>,
    phase: Phase,
    /// Armed deferred block: (generation, limit the timer was armed against)
    pending: Option<(u64, u32)>,
    next_generation: u64,
}

impl LimitEngine {
    pub fn new(
        own_package: PackageId,
        store: Arc<dyn RestrictionStore>,
        activity_log: Arc<Mutex<ActivityLog>>,
    ) -> Self {
        info!(own_package = %own_package, "Limit engine initialized");
        Self {
            own_package,
            ledger: UsageLedger::new(store.clone()),
            cooldown: CooldownTracker::new(store.clone()),
            store,
            activity_log,
            current: None,
            phase: Phase::Idle,
            pending: None,
            next_generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_package(&self) -> Option<&PackageId> {
        self.current.as_ref().map(|s| &s.package)
    }

    /// Process one event, returning the effects to apply
    pub fn handle_event(&mut self, event: EngineEvent) -> Vec<Effect> {
        match event {
            EngineEvent::Foreground {
                package,
                class_name,
                at,
                now,
            } => self.on_foreground(package, class_name, at, now),
            EngineEvent::DeferredBlockFired { generation, at } => {
                self.on_deferred_fired(generation, at)
            }
            EngineEvent::LimitChanged { package, at } => self.on_limit_changed(package, at),
        }
    }

    /// Teardown: flush the active session exactly as a foreground change
    /// would. No deferred timer survives.
    pub fn stop(&mut self, at: MonotonicInstant) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.stop_current(at, &mut effects);
        info!("Limit engine stopped");
        effects
    }

    fn on_foreground(
        &mut self,
        package: PackageId,
        class_name: String,
        at: MonotonicInstant,
        now: chrono::DateTime<chrono::Local>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        if package == self.own_package {
            return effects;
        }

        let changed = self.current.as_ref().map(|s| &s.package) != Some(&package);
        if changed {
            self.stop_current(at, &mut effects);
            self.current = Some(TrackingSession {
                package: package.clone(),
                started_at: at,
            });

            if let Err(e) = self.ledger.reset_if_new_day(now.date_naive()) {
                warn!(error = %e, "Day-boundary check failed");
            }

            self.evaluate(&package, at, &mut effects);
        }

        if class_name.to_ascii_lowercase().ends_with("activity") {
            if let Ok(mut log) = self.activity_log.lock() {
                log.record(package.clone(), class_name.clone(), now);
            }
            self.check_activity_blocklist(&class_name, &mut effects);
        }

        effects
    }

    fn on_deferred_fired(&mut self, generation: u64, _at: MonotonicInstant) -> Vec<Effect> {
        let mut effects = Vec::new();

        let armed_limit = match self.pending {
            Some((g, limit)) if g == generation => limit,
            _ => {
                debug!(generation, "Stale deferred block ignored");
                return effects;
            }
        };
        self.pending = None;

        let Some(session) = &self.current else {
            return effects;
        };

        // Report the limit the timer was armed against, not whatever the
        // store says now; a concurrent limit edit cancels and re-arms
        // through its own path.
        info!(package = %session.package, limit_minutes = armed_limit, "Daily budget exhausted");

        self.phase = Phase::BlockedTimeUp;
        effects.push(Effect::LaunchBlockPage(BlockPage::TimeUp {
            package: session.package.clone(),
            limit_minutes: armed_limit,
        }));
        effects
    }

    fn on_limit_changed(&mut self, package: PackageId, at: MonotonicInstant) -> Vec<Effect> {
        let mut effects = Vec::new();

        let tracked = self
            .current
            .as_ref()
            .is_some_and(|s| s.package == package);
        if !tracked {
            return effects;
        }

        if self.pending.take().is_some() {
            effects.push(Effect::CancelDeferredBlock);
        }

        // Flush the in-flight session so the new budget is judged against
        // everything used so far, then restart the session clock.
        if let Some(session) = self.current.as_mut() {
            let elapsed_ms = at.duration_since(session.started_at).as_millis() as i64;
            if let Err(e) = self.ledger.add_usage(&package, elapsed_ms) {
                warn!(package = %package, error = %e, "Session flush failed");
            }
            session.started_at = at;
        }

        debug!(package = %package, "Limit changed for tracked package, re-evaluating");
        self.evaluate(&package, at, &mut effects);
        effects
    }

    /// Flush and drop the active session; cancels the deferred timer and
    /// records the cooldown close time when no residual cooldown is owed.
    fn stop_current(&mut self, at: MonotonicInstant, effects: &mut Vec<Effect>) {
        if self.pending.take().is_some() {
            effects.push(Effect::CancelDeferredBlock);
        }

        let Some(session) = self.current.take() else {
            self.phase = Phase::Idle;
            return;
        };

        if let Err(e) = self.cooldown.record_close_if_clean(&session.package, at) {
            warn!(package = %session.package, error = %e, "Cooldown record failed");
        }

        let elapsed_ms = at.duration_since(session.started_at).as_millis() as i64;
        if let Err(e) = self.ledger.add_usage(&session.package, elapsed_ms) {
            warn!(package = %session.package, error = %e, "Session flush failed");
        }

        self.phase = Phase::Idle;
    }

    fn evaluate(&mut self, package: &PackageId, at: MonotonicInstant, effects: &mut Vec<Effect>) {
        let Some(limit) = self.limit_minutes(package).filter(|m| *m > 0) else {
            self.phase = Phase::Tracking;
            return;
        };

        let used = match self.ledger.used_millis(package) {
            Ok(v) => v,
            Err(e) => {
                warn!(package = %package, error = %e, "Usage lookup failed");
                0
            }
        };

        let limit_millis = u64::from(limit) * 60_000;
        if used >= limit_millis {
            // An exactly exhausted budget blocks now, never via a
            // zero-delay timer
            info!(package = %package, used_ms = used, "Entered with exhausted budget");
            self.phase = Phase::BlockedTimeUp;
            effects.push(Effect::LaunchBlockPage(BlockPage::TimeUp {
                package: package.clone(),
                limit_minutes: limit,
            }));
            return;
        }

        let cooldown_seconds = match self.cooldown.seconds_remaining(package, at) {
            Ok(v) => v,
            Err(e) => {
                warn!(package = %package, error = %e, "Cooldown lookup failed");
                0
            }
        };
        if cooldown_seconds > 0 {
            info!(package = %package, remaining_seconds = cooldown_seconds, "Reopen cooldown active");
            self.phase = Phase::BlockedCooldown;
            effects.push(Effect::LaunchBlockPage(BlockPage::Cooldown {
                package: package.clone(),
                remaining_seconds: cooldown_seconds,
            }));
            return;
        }

        let remaining = limit_millis - used;
        let generation = self.next_generation;
        self.next_generation += 1;
        self.pending = Some((generation, limit));

        debug!(
            package = %package,
            remaining_ms = remaining,
            generation,
            "Deferred block armed"
        );
        effects.push(Effect::ArmDeferredBlock {
            generation,
            after: Duration::from_millis(remaining),
        });
        self.phase = Phase::Tracking;
    }

    fn check_activity_blocklist(&self, class_name: &str, effects: &mut Vec<Effect>) {
        let enabled = match self.store.activity_blocker_enabled() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Activity blocker flag lookup failed");
                false
            }
        };
        if !enabled {
            return;
        }

        let blocked = match self.store.blocked_activities() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Blocked activity lookup failed");
                return;
            }
        };

        if blocked.iter().any(|c| c == class_name) {
            let short = class_name.rsplit('.').next().unwrap_or(class_name);
            info!(class_name, "Blocked activity bounced");
            effects.push(Effect::NavigateBack);
            effects.push(Effect::ShowNotice(format!("{short} is blocked")));
        }
    }

    fn limit_minutes(&self, package: &PackageId) -> Option<u32> {
        match self.store.limit_minutes(package) {
            Ok(v) => v,
            Err(e) => {
                warn!(package = %package, error = %e, "Limit lookup failed");
                None
            }
        }
    }
}
