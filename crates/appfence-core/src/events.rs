//! Engine events and effects

use appfence_api::BlockPage;
use appfence_util::{MonotonicInstant, PackageId};
use chrono::{DateTime, Local};
use std::time::Duration;

/// Input to the limit scheduler reducer
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A window came to the foreground
    Foreground {
        package: PackageId,
        class_name: String,
        /// Monotonic reading for session/cooldown arithmetic
        at: MonotonicInstant,
        /// Wall clock for the activity log and the day boundary
        now: DateTime<Local>,
    },

    /// The armed deferred block elapsed
    DeferredBlockFired {
        generation: u64,
        at: MonotonicInstant,
    },

    /// The limit configuration for a package changed
    LimitChanged {
        package: PackageId,
        at: MonotonicInstant,
    },
}

/// Side effect requested by the reducer, applied by the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Present a blocking page over the foreground app
    LaunchBlockPage(BlockPage),

    /// Perform a global back navigation
    NavigateBack,

    /// Show a transient notice to the user
    ShowNotice(String),

    /// Arm the single deferred-block timer. The daemon feeds the timer back
    /// as `DeferredBlockFired` carrying the same generation.
    ArmDeferredBlock { generation: u64, after: Duration },

    /// Disarm the deferred-block timer
    CancelDeferredBlock,
}
