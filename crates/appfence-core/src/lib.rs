//! Foreground monitoring and enforcement engine
//!
//! The engine consumes the platform's window-focus event stream and enforces
//! per-app daily time budgets, reopen cooldowns, and the activity blocklist.
//! All restriction changes route through the security session gate.
//!
//! The limit scheduler is a pure reducer over (state, event); side effects
//! come out as [`Effect`] values the daemon applies against the platform
//! host, so the whole state machine is testable without a platform.

mod activity_log;
mod browser;
mod cooldown;
mod engine;
mod events;
mod guard;
mod ledger;
mod security;
mod service;

pub use activity_log::*;
pub use browser::*;
pub use cooldown::*;
pub use engine::*;
pub use events::*;
pub use guard::*;
pub use ledger::*;
pub use security::*;
pub use service::*;
