//! Shared utilities for appfence
//!
//! This crate provides:
//! - ID types (PackageId, ListId)
//! - Time utilities (monotonic time, day keys)
//! - Error types
//! - Passphrase attempt limiting
//! - Default paths for the socket and data directories

mod attempts;
mod error;
mod ids;
mod paths;
mod time;

pub use attempts::*;
pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
