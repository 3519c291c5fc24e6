//! Session-gated restriction service
//!
//! Executes restriction commands coming from the UI. Every mutating command
//! passes through the security gate first; refusals go back to the caller
//! so the prompt can show an inline error and retry.

use appfence_api::{CommandOutcome, CommandRequest, RefusalReason, RestrictionCommand};
use appfence_host_api::{HostCapabilities, PolicyLayer};
use appfence_store::RestrictionStore;
use appfence_util::{FenceError, PackageId, Result};
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

use crate::{ActivityLog, AuthOutcome, BrowserPolicy, SecurityGate};

/// Side channel from the service to the engine loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSignal {
    /// A limit configuration changed; the engine must re-evaluate if the
    /// package is currently tracked
    LimitChanged { package: PackageId },
}

pub struct RestrictionService {
    store: Arc<dyn RestrictionStore>,
    gate: SecurityGate,
    browser: BrowserPolicy,
    policy: Arc<dyn PolicyLayer>,
    capabilities: HostCapabilities,
    activity_log: Arc<Mutex<ActivityLog>>,
}

impl RestrictionService {
    pub fn new(
        store: Arc<dyn RestrictionStore>,
        policy: Arc<dyn PolicyLayer>,
        capabilities: HostCapabilities,
        activity_log: Arc<Mutex<ActivityLog>>,
    ) -> Self {
        Self {
            gate: SecurityGate::new(store.clone()),
            browser: BrowserPolicy::new(store.clone(), policy.clone()),
            store,
            policy,
            capabilities,
            activity_log,
        }
    }

    pub fn browser_policy(&self) -> &BrowserPolicy {
        &self.browser
    }

    /// Execute one command, returning the outcome and an optional signal for
    /// the engine loop.
    pub async fn handle_command(
        &mut self,
        request: &CommandRequest,
        now: DateTime<Local>,
        mono_now: Instant,
    ) -> (CommandOutcome, Option<ServiceSignal>) {
        if request.command.requires_authorization() {
            let outcome = self
                .gate
                .authorize(request.passphrase.as_deref(), now, mono_now);
            match outcome {
                Ok(AuthOutcome::Granted) => {}
                Ok(AuthOutcome::PassphraseRequired) => {
                    return (
                        CommandOutcome::Refused {
                            reason: RefusalReason::PassphraseRequired,
                        },
                        None,
                    );
                }
                Ok(AuthOutcome::WrongPassphrase) => {
                    warn!(request_id = request.request_id, "Wrong passphrase");
                    return (
                        CommandOutcome::Refused {
                            reason: RefusalReason::WrongPassphrase,
                        },
                        None,
                    );
                }
                Ok(AuthOutcome::Throttled { .. }) => {
                    return (
                        CommandOutcome::Refused {
                            reason: RefusalReason::TooManyAttempts,
                        },
                        None,
                    );
                }
                Err(e) => {
                    return (
                        CommandOutcome::Failed {
                            message: e.to_string(),
                        },
                        None,
                    );
                }
            }
        }

        match self.execute(&request.command).await {
            Ok((outcome, signal)) => (outcome, signal),
            Err(e) => {
                warn!(request_id = request.request_id, error = %e, "Command failed");
                (
                    CommandOutcome::Failed {
                        message: e.to_string(),
                    },
                    None,
                )
            }
        }
    }

    async fn execute(
        &mut self,
        command: &RestrictionCommand,
    ) -> Result<(CommandOutcome, Option<ServiceSignal>)> {
        match command {
            RestrictionCommand::SetLimit { package, minutes } => {
                self.store
                    .set_limit_minutes(package, *minutes)
                    .map_err(store_err)?;
                info!(package = %package, minutes, "Limit updated");
                Ok((
                    CommandOutcome::Ok,
                    Some(ServiceSignal::LimitChanged {
                        package: package.clone(),
                    }),
                ))
            }

            RestrictionCommand::SetReopenSeconds { package, seconds } => {
                self.store
                    .set_reopen_seconds(package, *seconds)
                    .map_err(store_err)?;
                info!(package = %package, seconds, "Reopen cooldown updated");
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::BlockActivity { class_name } => {
                self.store
                    .set_activity_blocked(class_name, true)
                    .map_err(store_err)?;
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::UnblockActivity { class_name } => {
                self.store
                    .set_activity_blocked(class_name, false)
                    .map_err(store_err)?;
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::SetActivityBlockerEnabled { enabled } => {
                self.store
                    .set_activity_blocker_enabled(*enabled)
                    .map_err(store_err)?;
                info!(enabled, "Activity blocker toggled");
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::SaveSiteList { list } => {
                self.store.save_site_list(list).map_err(store_err)?;
                self.browser.apply_to_all().await?;
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::RemoveSiteList { id } => {
                self.store.remove_site_list(id).map_err(store_err)?;
                self.browser.apply_to_all().await?;
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::SetHidden { package, hidden } => {
                if !self.capabilities.can_hide_packages {
                    return Err(FenceError::host("Host cannot hide packages"));
                }
                self.policy
                    .set_hidden(package, *hidden)
                    .await
                    .map_err(host_err)?;
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::SetSuspended { package, suspended } => {
                if !self.capabilities.can_suspend_packages {
                    return Err(FenceError::host("Host cannot suspend packages"));
                }
                self.policy
                    .set_suspended(package, *suspended)
                    .await
                    .map_err(host_err)?;
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::SetUninstallBlocked { package, blocked } => {
                if !self.capabilities.can_block_uninstall {
                    return Err(FenceError::host("Host cannot block uninstallation"));
                }
                self.policy
                    .set_uninstall_blocked(package, *blocked)
                    .await
                    .map_err(host_err)?;
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::GenerateRecoveryPassphrase => {
                let plaintext = SecurityGate::generate_passphrase();
                self.gate.set_recovery_passphrase(&plaintext)?;
                Ok((CommandOutcome::Passphrase { plaintext }, None))
            }

            RestrictionCommand::EndSecuritySession => {
                self.gate.end_session();
                Ok((CommandOutcome::Ok, None))
            }

            RestrictionCommand::GetActivityLog => {
                let entries = self
                    .activity_log
                    .lock()
                    .map(|log| log.entries())
                    .unwrap_or_default();
                Ok((CommandOutcome::ActivityLog { entries }, None))
            }

            RestrictionCommand::GetUsage { package } => {
                let used_millis = self.store.used_millis(package).map_err(store_err)?;
                Ok((
                    CommandOutcome::Usage {
                        package: package.clone(),
                        used_millis,
                    },
                    None,
                ))
            }
        }
    }
}

fn store_err(e: appfence_store::StoreError) -> FenceError {
    FenceError::store(e.to_string())
}

fn host_err(e: appfence_host_api::HostError) -> FenceError {
    FenceError::host(e.to_string())
}
