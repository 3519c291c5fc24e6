//! Protocol types for the appfence bridge
//!
//! This crate defines the stable vocabulary between appfenced and the
//! platform shim:
//! - Platform events (shim -> daemon)
//! - Host directives (daemon -> shim)
//! - Restriction commands (UI -> daemon, session-gated)
//! - NDJSON bridge message wrappers

mod bridge;
mod commands;
mod events;
mod node;
mod types;

pub use bridge::*;
pub use commands::*;
pub use events::*;
pub use node::*;
pub use types::*;

/// Current bridge protocol version
pub const BRIDGE_VERSION: u32 = 1;
