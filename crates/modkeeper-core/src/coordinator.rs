//! Component wiring
//!
//! Builds the status registry, connector, module manager and orchestrator
//! once and hands out shared references. There is no global instance.

use crate::config::{ConfigSource, CoreConfig};
use crate::modules::{
    ComponentResolver, DirectoryComponentIndex, Inventory, ManifestRuntime, ModuleLayout,
    ModuleManager, ModuleRecord, ModuleRuntime, StagingError, inventory,
};
use crate::reload::{ReloadOrchestrator, ReloadOutcome};
use crate::status::{CONFIG_KEY, DATABASE_KEY, StatusEntry, StatusRegistry};
use crate::store::{ConnectionState, DEFAULT_PING_TIMEOUT, ResourceConnector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Operator-facing snapshot of the whole system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub database_connected: bool,
    pub database_state: ConnectionState,
    pub debug: bool,
    pub loaded_modules: usize,
    pub enabled_count: usize,
    pub total_count: usize,
    /// Every status entry, sorted by key
    pub components: BTreeMap<String, StatusEntry>,
    /// Module identity -> enabled
    pub modules: BTreeMap<String, bool>,
    /// Loaded modules sorted by identity
    pub records: Vec<ModuleRecord>,
}

/// What a host would start with, gathered without staging, loading or
/// connecting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionReport {
    /// Why the configuration could not be read; defaults are shown instead
    pub config_error: Option<String>,
    /// Store target when the store is enabled, without credentials
    pub database: Option<String>,
    pub debug: bool,
    pub auto_reload: bool,
    #[serde(flatten)]
    pub inventory: Inventory,
    /// Directories that could not be read
    pub problems: Vec<String>,
}

pub struct CoordinatorBuilder {
    layout: ModuleLayout,
    config: Arc<dyn ConfigSource>,
    runtime: Option<Arc<dyn ModuleRuntime>>,
    resolver: Option<Arc<dyn ComponentResolver>>,
    status: Option<Arc<StatusRegistry>>,
    ping_timeout: Duration,
}

impl CoordinatorBuilder {
    pub fn with_runtime(mut self, runtime: Arc<dyn ModuleRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ComponentResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Share an existing registry instead of creating one
    pub fn with_status(mut self, status: Arc<StatusRegistry>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    pub fn build(self) -> Coordinator {
        let status = self
            .status
            .unwrap_or_else(|| Arc::new(StatusRegistry::new()));
        let runtime: Arc<dyn ModuleRuntime> = match self.runtime {
            Some(runtime) => runtime,
            None => Arc::new(ManifestRuntime::new()),
        };
        let resolver: Arc<dyn ComponentResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(DirectoryComponentIndex::new(
                self.layout.inbound_dir.clone(),
                self.layout.package_extension.clone(),
            )),
        };

        let connector = Arc::new(
            ResourceConnector::new(status.clone()).with_ping_timeout(self.ping_timeout),
        );
        let modules = Arc::new(ModuleManager::new(
            self.layout,
            runtime,
            resolver,
            status.clone(),
        ));
        let orchestrator = Arc::new(ReloadOrchestrator::new(
            self.config.clone(),
            connector.clone(),
            modules.clone(),
            status.clone(),
        ));

        Coordinator {
            config: self.config,
            status,
            connector,
            modules,
            orchestrator,
        }
    }
}

/// Owner of the four core components
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<dyn ConfigSource>,
    status: Arc<StatusRegistry>,
    connector: Arc<ResourceConnector>,
    modules: Arc<ModuleManager>,
    orchestrator: Arc<ReloadOrchestrator>,
}

impl Coordinator {
    pub fn builder(layout: ModuleLayout, config: Arc<dyn ConfigSource>) -> CoordinatorBuilder {
        CoordinatorBuilder {
            layout,
            config,
            runtime: None,
            resolver: None,
            status: None,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    /// Coordinator with the manifest runtime and a directory index over the
    /// inbound directory
    pub fn new(layout: ModuleLayout, config: Arc<dyn ConfigSource>) -> Self {
        Self::builder(layout, config).build()
    }

    pub async fn start(&self) -> ReloadOutcome {
        self.orchestrator.startup().await
    }

    pub async fn reload(&self) -> ReloadOutcome {
        self.orchestrator.reload().await
    }

    pub async fn shutdown(&self) {
        self.orchestrator.shutdown().await
    }

    pub async fn report(&self) -> StatusReport {
        let mut records: Vec<ModuleRecord> =
            self.modules.list_modules().await.into_values().collect();
        records.sort_by(|a, b| a.identity.cmp(&b.identity));

        let mut modules = self.status.module_views();
        modules.remove(DATABASE_KEY);
        modules.remove(CONFIG_KEY);

        StatusReport {
            database_connected: self.connector.is_connected().await,
            database_state: self.connector.state().await,
            debug: self
                .orchestrator
                .last_config()
                .map(|c| c.debug.enabled)
                .unwrap_or(false),
            loaded_modules: records.len(),
            enabled_count: self.status.count_enabled(),
            total_count: self.status.count_total(),
            components: self.status.snapshot(),
            modules,
            records,
        }
    }

    /// Read the configuration and the package directories without changing
    /// anything, neither on disk nor in the registry
    pub async fn inspect(&self) -> InspectionReport {
        let (config, config_error) = match self.config.load().await {
            Ok(config) => (config, None),
            Err(e) => (CoreConfig::default(), Some(e.to_string())),
        };

        let layout = self.modules.layout().clone();
        let options = config.modules.staging_options();
        let listed = tokio::task::spawn_blocking(move || inventory(&layout, &options))
            .await
            .unwrap_or_else(|e| Err(StagingError::Task(e.to_string())));

        let (inventory, problems) = match listed {
            Ok(inventory) => (inventory, Vec::new()),
            Err(e) => {
                warn!("Inspection incomplete: {}", e);
                (Inventory::default(), vec![e.to_string()])
            }
        };

        InspectionReport {
            config_error,
            database: config
                .database
                .enabled
                .then(|| config.database.connection().target()),
            debug: config.debug.enabled,
            auto_reload: config.modules.auto_reload,
            inventory,
            problems,
        }
    }

    pub fn status(&self) -> &Arc<StatusRegistry> {
        &self.status
    }

    pub fn connector(&self) -> &Arc<ResourceConnector> {
        &self.connector
    }

    pub fn modules(&self) -> &Arc<ModuleManager> {
        &self.modules
    }

    pub fn orchestrator(&self) -> &Arc<ReloadOrchestrator> {
        &self.orchestrator
    }
}
