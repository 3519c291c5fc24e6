//! Restriction commands (UI -> daemon)
//!
//! Every command that mutates a restriction is gated by the security
//! session: the daemon allows it outright when no recovery passphrase is
//! configured or a session is active, and otherwise verifies the candidate
//! passphrase carried alongside the command.

use appfence_util::{ListId, PackageId};
use serde::{Deserialize, Serialize};

use crate::SiteList;

/// Request wrapper with correlation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Request ID for correlation
    pub request_id: u64,
    /// Candidate passphrase, if the UI prompted for one
    pub passphrase: Option<String>,
    /// The command
    pub command: RestrictionCommand,
}

/// All restriction-mutating and query commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RestrictionCommand {
    /// Set a per-app daily limit; `minutes == 0` clears it
    SetLimit { package: PackageId, minutes: u32 },

    /// Set a per-app reopen cooldown; `seconds == 0` clears it
    SetReopenSeconds { package: PackageId, seconds: u32 },

    /// Add an activity class name to the blocklist
    BlockActivity { class_name: String },

    /// Remove an activity class name from the blocklist
    UnblockActivity { class_name: String },

    /// Enable or disable the activity blocker as a whole
    SetActivityBlockerEnabled { enabled: bool },

    /// Create or update a site list and re-apply browser restrictions
    SaveSiteList { list: SiteList },

    /// Remove a site list and re-apply browser restrictions
    RemoveSiteList { id: ListId },

    /// Hide or unhide a package via the policy layer
    SetHidden { package: PackageId, hidden: bool },

    /// Suspend or unsuspend a package via the policy layer
    SetSuspended { package: PackageId, suspended: bool },

    /// Block or unblock uninstallation of a package
    SetUninstallBlocked { package: PackageId, blocked: bool },

    /// Generate a recovery passphrase, persist its hash, and return the
    /// plaintext exactly once for the user to write down
    GenerateRecoveryPassphrase,

    /// Explicitly end the active security session
    EndSecuritySession,

    /// Snapshot of the recent-activity log (read-only, not gated)
    GetActivityLog,

    /// Per-package usage so far today in milliseconds (read-only, not gated)
    GetUsage { package: PackageId },
}

impl RestrictionCommand {
    /// Whether this command mutates restrictions and therefore requires
    /// authorization
    pub fn requires_authorization(&self) -> bool {
        !matches!(
            self,
            RestrictionCommand::GetActivityLog | RestrictionCommand::GetUsage { .. }
        )
    }
}

/// Result of a command, sent back over the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub request_id: u64,
    pub outcome: CommandOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandOutcome {
    Ok,
    /// Freshly generated recovery passphrase (never persisted in plaintext)
    Passphrase { plaintext: String },
    ActivityLog { entries: Vec<crate::ActivityLogEntry> },
    Usage { package: PackageId, used_millis: u64 },
    /// The command was refused; the UI shows an inline error and may retry
    Refused { reason: RefusalReason },
    Failed { message: String },
}

/// Why a gated command was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    /// No passphrase was supplied but one is required
    PassphraseRequired,
    /// The supplied passphrase did not match
    WrongPassphrase,
    /// Too many failed attempts; retry after the window lapses
    TooManyAttempts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gated_commands_require_authorization() {
        let cmd = RestrictionCommand::SetLimit {
            package: PackageId::new("org.example.game"),
            minutes: 30,
        };
        assert!(cmd.requires_authorization());

        assert!(!RestrictionCommand::GetActivityLog.requires_authorization());
    }

    #[test]
    fn command_request_roundtrip() {
        let req = CommandRequest {
            request_id: 7,
            passphrase: Some("ABCDEFGHIJKLMNOP".into()),
            command: RestrictionCommand::EndSecuritySession,
        };

        let json = serde_json::to_string(&req).unwrap();
        let parsed: CommandRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, 7);
        assert!(matches!(
            parsed.command,
            RestrictionCommand::EndSecuritySession
        ));
    }
}
