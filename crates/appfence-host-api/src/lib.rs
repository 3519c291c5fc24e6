//! Platform host trait interfaces for appfenced
//!
//! This crate defines the capability-based interface between the daemon core
//! and platform-specific implementations. It contains no platform code itself.

mod capabilities;
mod mock;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
