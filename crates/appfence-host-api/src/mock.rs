//! Mock host for testing

use appfence_api::BlockPage;
use appfence_util::PackageId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::{HostCapabilities, HostError, HostResult, PlatformHost, PolicyLayer};

/// An enforcement action the mock host received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    BlockPage(BlockPage),
    NavigateBack,
    Notice(String),
}

/// Mock platform host for unit/integration testing
pub struct MockHost {
    capabilities: HostCapabilities,
    labels: Arc<Mutex<HashMap<PackageId, String>>>,
    actions: Arc<Mutex<Vec<RecordedAction>>>,

    /// Configure block-page launches to fail
    pub fail_block_page: Arc<Mutex<bool>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            capabilities: HostCapabilities::full(),
            labels: Arc::new(Mutex::new(HashMap::new())),
            actions: Arc::new(Mutex::new(Vec::new())),
            fail_block_page: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_capabilities(mut self, caps: HostCapabilities) -> Self {
        self.capabilities = caps;
        self
    }

    pub fn set_label(&self, package: PackageId, label: impl Into<String>) {
        self.labels.lock().unwrap().insert(package, label.into());
    }

    /// All actions received so far, in order
    pub fn actions(&self) -> Vec<RecordedAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn clear_actions(&self) {
        self.actions.lock().unwrap().clear();
    }

    fn record(&self, action: RecordedAction) {
        self.actions.lock().unwrap().push(action);
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformHost for MockHost {
    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    fn app_label(&self, package: &PackageId) -> Option<String> {
        self.labels.lock().unwrap().get(package).cloned()
    }

    async fn launch_block_page(&self, page: BlockPage) -> HostResult<()> {
        if *self.fail_block_page.lock().unwrap() {
            return Err(HostError::LaunchFailed("Mock launch failure".into()));
        }
        self.record(RecordedAction::BlockPage(page));
        Ok(())
    }

    async fn navigate_back(&self) -> HostResult<()> {
        self.record(RecordedAction::NavigateBack);
        Ok(())
    }

    async fn show_notice(&self, message: &str) -> HostResult<()> {
        self.record(RecordedAction::Notice(message.to_string()));
        Ok(())
    }
}

/// Mock policy layer for testing browser restrictions
pub struct MockPolicyLayer {
    browsers: Arc<Mutex<HashSet<PackageId>>>,
    managed: Arc<Mutex<HashSet<PackageId>>>,
    /// Last blocklist applied per package
    pub applied_blocklists: Arc<Mutex<HashMap<PackageId, Vec<String>>>>,
    /// Current suspension state per package
    pub suspended: Arc<Mutex<HashMap<PackageId, bool>>>,
    pub hidden: Arc<Mutex<HashMap<PackageId, bool>>>,
    pub uninstall_blocked: Arc<Mutex<HashMap<PackageId, bool>>>,
}

impl MockPolicyLayer {
    pub fn new() -> Self {
        Self {
            browsers: Arc::new(Mutex::new(HashSet::new())),
            managed: Arc::new(Mutex::new(HashSet::new())),
            applied_blocklists: Arc::new(Mutex::new(HashMap::new())),
            suspended: Arc::new(Mutex::new(HashMap::new())),
            hidden: Arc::new(Mutex::new(HashMap::new())),
            uninstall_blocked: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a browser; `managed` controls whether it accepts URL
    /// blocklist configuration
    pub fn add_browser(&self, package: PackageId, managed: bool) {
        self.browsers.lock().unwrap().insert(package.clone());
        if managed {
            self.managed.lock().unwrap().insert(package);
        }
    }
}

impl Default for MockPolicyLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyLayer for MockPolicyLayer {
    async fn is_browser(&self, package: &PackageId) -> HostResult<bool> {
        Ok(self.browsers.lock().unwrap().contains(package))
    }

    async fn browser_packages(&self) -> HostResult<Vec<PackageId>> {
        Ok(self.browsers.lock().unwrap().iter().cloned().collect())
    }

    async fn supports_managed_config(&self, package: &PackageId) -> HostResult<bool> {
        Ok(self.managed.lock().unwrap().contains(package))
    }

    async fn apply_url_blocklist(&self, package: &PackageId, urls: &[String]) -> HostResult<()> {
        self.applied_blocklists
            .lock()
            .unwrap()
            .insert(package.clone(), urls.to_vec());
        Ok(())
    }

    async fn set_suspended(&self, package: &PackageId, suspended: bool) -> HostResult<()> {
        self.suspended
            .lock()
            .unwrap()
            .insert(package.clone(), suspended);
        Ok(())
    }

    async fn set_hidden(&self, package: &PackageId, hidden: bool) -> HostResult<()> {
        self.hidden.lock().unwrap().insert(package.clone(), hidden);
        Ok(())
    }

    async fn set_uninstall_blocked(&self, package: &PackageId, blocked: bool) -> HostResult<()> {
        self.uninstall_blocked
            .lock()
            .unwrap()
            .insert(package.clone(), blocked);
        Ok(())
    }
}
