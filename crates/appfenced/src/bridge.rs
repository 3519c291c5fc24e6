//! NDJSON bridge to the platform shim
//!
//! The shim connects over a Unix domain socket and exchanges one JSON object
//! per line. Inbound lines are platform events and UI commands; outbound
//! lines are host directives and command results.
//!
//! The bridge also maintains two tables fed by the shim on connect: package
//! display labels and the browser inventory. [`BridgeHost`] and
//! [`BridgePolicy`] answer their synchronous lookups from these tables and
//! turn everything else into outbound directives.

use appfence_api::{
    BlockPage, CommandRequest, HostDirective, InboundMessage, OutboundMessage, PlatformEvent,
    BRIDGE_VERSION,
};
use appfence_host_api::{HostCapabilities, HostError, HostResult, PlatformHost, PolicyLayer};
use appfence_util::PackageId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Bridge not started")]
    NotStarted,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Message from the shim to the daemon loop
pub enum BridgeMessage {
    Event { event: PlatformEvent },
    Command { request: CommandRequest },
    ShimConnected,
    ShimDisconnected,
}

type LabelTable = Arc<StdMutex<HashMap<PackageId, String>>>;
type BrowserTable = Arc<StdMutex<HashMap<PackageId, bool>>>;

/// Bridge server
pub struct BridgeServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    outbound_tx: broadcast::Sender<OutboundMessage>,
    message_tx: mpsc::UnboundedSender<BridgeMessage>,
    message_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<BridgeMessage>>>>,
    labels: LabelTable,
    browsers: BrowserTable,
}

impl BridgeServer {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        // A shim writer that falls this far behind skips directives
        // (broadcast lag); sized well above any realistic directive burst
        let (outbound_tx, _) = broadcast::channel(256);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            listener: None,
            outbound_tx,
            message_tx,
            message_rx: Arc::new(Mutex::new(Some(message_rx))),
            labels: Arc::new(StdMutex::new(HashMap::new())),
            browsers: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Start listening
    pub async fn start(&mut self) -> BridgeResult<()> {
        // Remove existing socket if present
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        // Create parent directory if needed
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        // Owner-only: the shim runs as the same user, UIs from other
        // accounts have no business here
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;

        info!(path = %self.socket_path.display(), "Bridge listening");

        self.listener = Some(listener);

        Ok(())
    }

    /// Get receiver for bridge messages
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<BridgeMessage>> {
        self.message_rx.lock().await.take()
    }

    /// A [`PlatformHost`] backed by this bridge
    pub fn host(&self) -> BridgeHost {
        BridgeHost {
            capabilities: HostCapabilities::full(),
            outbound_tx: self.outbound_tx.clone(),
            labels: self.labels.clone(),
        }
    }

    /// A [`PolicyLayer`] backed by this bridge
    pub fn policy(&self) -> BridgePolicy {
        BridgePolicy {
            outbound_tx: self.outbound_tx.clone(),
            browsers: self.browsers.clone(),
        }
    }

    /// Send an outbound message to every connected shim
    pub fn send(&self, message: OutboundMessage) {
        let _ = self.outbound_tx.send(message);
    }

    /// Accept connections in a loop
    pub async fn run(&self) -> BridgeResult<()> {
        let listener = self.listener.as_ref().ok_or(BridgeError::NotStarted)?;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    info!("Shim connected");
                    self.handle_client(stream);
                    let _ = self.message_tx.send(BridgeMessage::ShimConnected);
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_client(&self, stream: UnixStream) {
        let (read_half, write_half) = stream.into_split();
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<OutboundMessage>();

        let message_tx = self.message_tx.clone();
        let labels = self.labels.clone();
        let browsers = self.browsers.clone();

        // Reader task
        tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("Shim disconnected (EOF)");
                        break;
                    }
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<InboundMessage>(line) {
                            Ok(InboundMessage::Hello { version }) => {
                                if version != BRIDGE_VERSION {
                                    warn!(version, "Shim speaks a different bridge version");
                                }
                                let _ = reply_tx.send(OutboundMessage::Hello {
                                    version: BRIDGE_VERSION,
                                });
                            }
                            Ok(InboundMessage::Event { event }) => {
                                Self::update_tables(&labels, &browsers, &event);
                                let _ = message_tx.send(BridgeMessage::Event { event });
                            }
                            Ok(InboundMessage::Command { request }) => {
                                let _ = message_tx.send(BridgeMessage::Command { request });
                            }
                            Err(e) => {
                                warn!(error = %e, "Invalid bridge message");
                            }
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Read error");
                        break;
                    }
                }
            }

            let _ = message_tx.send(BridgeMessage::ShimDisconnected);
        });

        // Writer task
        let mut outbound_rx = self.outbound_tx.subscribe();

        tokio::spawn(async move {
            let mut writer = write_half;

            loop {
                let message = tokio::select! {
                    Some(reply) = reply_rx.recv() => Some(reply),
                    outbound = outbound_rx.recv() => match outbound {
                        Ok(message) => Some(message),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "Shim writer lagged, directives dropped");
                            None
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };

                let Some(message) = message else { continue };
                let Ok(json) = serde_json::to_string(&message) else {
                    continue;
                };
                let mut msg = json;
                msg.push('\n');
                if let Err(e) = writer.write_all(msg.as_bytes()).await {
                    debug!(error = %e, "Write error");
                    break;
                }
            }
        });
    }

    /// The label and browser tables are snapshots the shim refreshes on
    /// connect and after package changes.
    fn update_tables(labels: &LabelTable, browsers: &BrowserTable, event: &PlatformEvent) {
        match event {
            PlatformEvent::PackageLabels { labels: pairs } => {
                if let Ok(mut table) = labels.lock() {
                    table.clear();
                    for (package, label) in pairs {
                        table.insert(package.clone(), label.clone());
                    }
                    debug!(count = table.len(), "Package labels refreshed");
                }
            }
            PlatformEvent::BrowserInventory { browsers: list } => {
                if let Ok(mut table) = browsers.lock() {
                    table.clear();
                    for info in list {
                        table.insert(info.package.clone(), info.supports_managed_config);
                    }
                    debug!(count = table.len(), "Browser inventory refreshed");
                }
            }
            _ => {}
        }
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl Drop for BridgeServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Enforcement surface backed by bridge directives
pub struct BridgeHost {
    capabilities: HostCapabilities,
    outbound_tx: broadcast::Sender<OutboundMessage>,
    labels: LabelTable,
}

impl BridgeHost {
    fn direct(&self, directive: HostDirective) -> HostResult<()> {
        self.outbound_tx
            .send(OutboundMessage::Directive { directive })
            .map(|_| ())
            .map_err(|_| HostError::Disconnected)
    }
}

#[async_trait]
impl PlatformHost for BridgeHost {
    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    fn app_label(&self, package: &PackageId) -> Option<String> {
        self.labels.lock().ok()?.get(package).cloned()
    }

    async fn launch_block_page(&self, page: BlockPage) -> HostResult<()> {
        self.direct(HostDirective::LaunchBlockPage { page })
    }

    async fn navigate_back(&self) -> HostResult<()> {
        self.direct(HostDirective::NavigateBack)
    }

    async fn show_notice(&self, message: &str) -> HostResult<()> {
        self.direct(HostDirective::ShowNotice {
            message: message.to_string(),
        })
    }
}

/// Device-policy surface backed by bridge directives and the shim's browser
/// inventory
pub struct BridgePolicy {
    outbound_tx: broadcast::Sender<OutboundMessage>,
    browsers: BrowserTable,
}

impl BridgePolicy {
    fn direct(&self, directive: HostDirective) -> HostResult<()> {
        self.outbound_tx
            .send(OutboundMessage::Directive { directive })
            .map(|_| ())
            .map_err(|_| HostError::Disconnected)
    }

    fn browsers(&self) -> HostResult<HashMap<PackageId, bool>> {
        self.browsers
            .lock()
            .map(|table| table.clone())
            .map_err(|_| HostError::Internal("Browser table poisoned".into()))
    }
}

#[async_trait]
impl PolicyLayer for BridgePolicy {
    async fn is_browser(&self, package: &PackageId) -> HostResult<bool> {
        Ok(self.browsers()?.contains_key(package))
    }

    async fn browser_packages(&self) -> HostResult<Vec<PackageId>> {
        Ok(self.browsers()?.into_keys().collect())
    }

    async fn supports_managed_config(&self, package: &PackageId) -> HostResult<bool> {
        Ok(self.browsers()?.get(package).copied().unwrap_or(false))
    }

    async fn apply_url_blocklist(&self, package: &PackageId, urls: &[String]) -> HostResult<()> {
        self.direct(HostDirective::ApplyUrlBlocklist {
            package: package.clone(),
            urls: urls.to_vec(),
        })
    }

    async fn set_suspended(&self, package: &PackageId, suspended: bool) -> HostResult<()> {
        self.direct(HostDirective::SetSuspended {
            package: package.clone(),
            suspended,
        })
    }

    async fn set_hidden(&self, package: &PackageId, hidden: bool) -> HostResult<()> {
        self.direct(HostDirective::SetHidden {
            package: package.clone(),
            hidden,
        })
    }

    async fn set_uninstall_blocked(&self, package: &PackageId, blocked: bool) -> HostResult<()> {
        self.direct(HostDirective::SetUninstallBlocked {
            package: package.clone(),
            blocked,
        })
    }
}
