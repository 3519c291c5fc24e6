//! NDJSON bridge message wrappers
//!
//! The platform shim connects to the daemon over a Unix domain socket and
//! exchanges one JSON object per line. Inbound messages are platform events
//! or UI commands; outbound messages are directives the shim executes plus
//! command results.

use appfence_util::PackageId;
use serde::{Deserialize, Serialize};

use crate::{BlockPage, CommandRequest, CommandResult, PlatformEvent};

/// shim -> daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Protocol handshake, first line on every connection
    Hello { version: u32 },
    Event { event: PlatformEvent },
    Command { request: CommandRequest },
}

/// daemon -> shim
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Hello { version: u32 },
    Directive { directive: HostDirective },
    CommandResult { result: CommandResult },
}

/// An action the shim must carry out on the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostDirective {
    /// Present a full-screen block page over the offending app
    LaunchBlockPage { page: BlockPage },

    /// Perform a global back navigation
    NavigateBack,

    /// Show a transient notice to the user
    ShowNotice { message: String },

    /// Push a merged URL blocklist to a managed browser
    ApplyUrlBlocklist {
        package: PackageId,
        urls: Vec<String>,
    },

    /// Suspend or unsuspend a package
    SetSuspended { package: PackageId, suspended: bool },

    /// Hide or unhide a package from the launcher
    SetHidden { package: PackageId, hidden: bool },

    /// Block or unblock uninstallation of a package
    SetUninstallBlocked { package: PackageId, blocked: bool },
}
