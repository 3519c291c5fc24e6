//! appfenced - The appfence background service
//!
//! This is the main entry point for the appfenced service. It wires
//! together:
//! - Settings loading
//! - Store initialization
//! - Limit engine and restriction service
//! - Anti-disable guard
//! - The NDJSON bridge to the platform shim

mod bridge;
mod settings;

use anyhow::{Context, Result};
use appfence_api::{
    CommandResult, EventKind, OutboundMessage, PlatformEvent,
};
use appfence_core::{
    ActivityLog, DisableGuard, Effect, EngineEvent, LimitEngine, RestrictionService, ServiceSignal,
};
use appfence_host_api::{PlatformHost, PolicyLayer};
use appfence_store::{RestrictionStore, SqliteStore};
use appfence_util::{default_config_path, MonotonicInstant, PackageId};
use bridge::{BridgeHost, BridgeMessage, BridgeServer};
use clap::Parser;
use settings::Settings;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// appfenced - Foreground monitoring and screen-time enforcement service
#[derive(Parser, Debug)]
#[command(name = "appfenced")]
#[command(about = "Foreground monitoring and screen-time enforcement service", long_about = None)]
struct Args {
    /// Settings file path (default: ~/.config/appfence/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set APPFENCE_SOCKET env var)
    #[arg(short, long, env = "APPFENCE_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set APPFENCE_DATA_DIR env var)
    #[arg(short, long, env = "APPFENCE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// A deferred block timer armed by the engine: fires the generation at the
/// given instant unless disarmed first
type DeferredBlock = Option<(u64, tokio::time::Instant)>;

/// Main service state
struct Service {
    engine: LimitEngine,
    service: RestrictionService,
    guard: DisableGuard,
    host: BridgeHost,
    bridge: Arc<BridgeServer>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let settings = Settings::load(&args.config)
            .with_context(|| format!("Failed to load settings from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            own_package = %settings.own_package,
            "Settings loaded"
        );

        // Determine paths
        let socket_path = args
            .socket
            .clone()
            .or_else(|| settings.socket_path.clone())
            .unwrap_or_else(appfence_util::socket_path_without_env);

        let data_dir = args
            .data_dir
            .clone()
            .or_else(|| settings.data_dir.clone())
            .unwrap_or_else(appfence_util::data_dir_without_env);

        // Create data directory
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join("appfence.db");
        let store: Arc<dyn RestrictionStore> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        // Start the bridge
        let mut bridge = BridgeServer::new(&socket_path);
        bridge.start().await?;

        let host = bridge.host();
        let policy: Arc<dyn PolicyLayer> = Arc::new(bridge.policy());

        // The activity log is shared between the engine (writer) and the
        // restriction service (reader)
        let activity_log = Arc::new(Mutex::new(ActivityLog::new()));

        let engine = LimitEngine::new(
            PackageId::new(&settings.own_package),
            store.clone(),
            activity_log.clone(),
        );
        let service =
            RestrictionService::new(store, policy, host.capabilities().clone(), activity_log);
        let guard = DisableGuard::new(settings.service_label);

        Ok(Self {
            engine,
            service,
            guard,
            host,
            bridge: Arc::new(bridge),
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut messages = self
            .bridge
            .take_message_receiver()
            .await
            .context("Bridge message receiver should be available")?;

        // Spawn bridge accept task
        let accept = self.bridge.clone();
        tokio::spawn(async move {
            if let Err(e) = accept.run().await {
                tracing::error!(error = %e, "Bridge server error");
            }
        });

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        let mut deferred: DeferredBlock = None;

        info!("Service running");

        loop {
            // An unarmed timer never completes
            let deferred_sleep = {
                let armed = deferred;
                async move {
                    match armed {
                        Some((_, when)) => tokio::time::sleep_until(when).await,
                        None => std::future::pending::<()>().await,
                    }
                }
            };

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Deferred block timer expired
                _ = deferred_sleep => {
                    if let Some((generation, _)) = deferred.take() {
                        let effects = self.engine.handle_event(EngineEvent::DeferredBlockFired {
                            generation,
                            at: MonotonicInstant::now(),
                        });
                        self.apply_effects(effects, &mut deferred).await;
                    }
                }

                // Bridge messages
                Some(msg) = messages.recv() => {
                    self.handle_bridge_message(msg, &mut deferred).await;
                }
            }
        }

        // Graceful shutdown: flush the in-flight session
        info!("Shutting down appfenced");
        let effects = self.engine.stop(MonotonicInstant::now());
        self.apply_effects(effects, &mut deferred).await;

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_bridge_message(&mut self, msg: BridgeMessage, deferred: &mut DeferredBlock) {
        match msg {
            BridgeMessage::Event { event } => self.handle_platform_event(event, deferred).await,

            BridgeMessage::Command { request } => {
                let request_id = request.request_id;
                let (outcome, signal) = self
                    .service
                    .handle_command(&request, appfence_util::now(), Instant::now())
                    .await;

                self.bridge.send(OutboundMessage::CommandResult {
                    result: CommandResult {
                        request_id,
                        outcome,
                    },
                });

                if let Some(ServiceSignal::LimitChanged { package }) = signal {
                    let effects = self.engine.handle_event(EngineEvent::LimitChanged {
                        package,
                        at: MonotonicInstant::now(),
                    });
                    self.apply_effects(effects, deferred).await;
                }
            }

            BridgeMessage::ShimConnected => {
                info!("Platform shim connected");
            }

            BridgeMessage::ShimDisconnected => {
                debug!("Platform shim disconnected");
            }
        }
    }

    async fn handle_platform_event(&mut self, event: PlatformEvent, deferred: &mut DeferredBlock) {
        match event {
            PlatformEvent::Window {
                package,
                class_name,
                kind,
                timestamp,
            } => {
                if kind != EventKind::WindowStateChanged {
                    return;
                }
                let effects = self.engine.handle_event(EngineEvent::Foreground {
                    package,
                    class_name,
                    at: MonotonicInstant::now(),
                    now: timestamp,
                });
                self.apply_effects(effects, deferred).await;
            }

            PlatformEvent::SettingsPaneOpened { tree } => {
                if self.guard.should_bounce(&tree)
                    && let Err(e) = self.host.navigate_back().await
                {
                    warn!(error = %e, "Guard back navigation failed");
                }
            }

            PlatformEvent::PackageAdded { package } => {
                if let Err(e) = self
                    .service
                    .browser_policy()
                    .handle_package_added(&package)
                    .await
                {
                    warn!(package = %package, error = %e, "Install-time policy failed");
                }
            }

            // Intercepted into the bridge's label table
            PlatformEvent::PackageLabels { .. } => {}

            // The inventory changed; push the current blocklist to any
            // newly managed browser
            PlatformEvent::BrowserInventory { .. } => {
                if let Err(e) = self.service.browser_policy().apply_to_all().await {
                    warn!(error = %e, "Blocklist re-application failed");
                }
            }
        }
    }

    async fn apply_effects(&mut self, effects: Vec<Effect>, deferred: &mut DeferredBlock) {
        for effect in effects {
            match effect {
                Effect::LaunchBlockPage(page) => {
                    if let Err(e) = self.host.launch_block_page(page).await {
                        warn!(error = %e, "Block page launch failed");
                    }
                }
                Effect::NavigateBack => {
                    if let Err(e) = self.host.navigate_back().await {
                        warn!(error = %e, "Back navigation failed");
                    }
                }
                Effect::ShowNotice(message) => {
                    if let Err(e) = self.host.show_notice(&message).await {
                        warn!(error = %e, "Notice failed");
                    }
                }
                Effect::ArmDeferredBlock { generation, after } => {
                    *deferred = Some((generation, tokio::time::Instant::now() + after));
                }
                Effect::CancelDeferredBlock => {
                    *deferred = None;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "appfenced starting");

    let service = Service::new(&args).await?;
    service.run().await
}
