//! Global reload
//!
//! Re-reads configuration, then reconciles the store and the modules in that
//! order. The two reconciliations are independent: a failing store never
//! prevents the module reload and vice versa.

use super::outcome::{ConfigStep, ModuleStep, ReloadOutcome, StoreStep};
use crate::config::{ConfigSource, CoreConfig};
use crate::modules::package::{PackageName, UNKNOWN_VERSION};
use crate::modules::{LoadReport, ModuleManager};
use crate::status::{CONFIG_KEY, StatusRegistry};
use crate::store::ResourceConnector;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub struct ReloadOrchestrator {
    config: Arc<dyn ConfigSource>,
    connector: Arc<ResourceConnector>,
    modules: Arc<ModuleManager>,
    status: Arc<StatusRegistry>,
    /// Serializes reloads; concurrent callers queue
    in_flight: Mutex<()>,
    last_config: RwLock<Option<CoreConfig>>,
}

impl ReloadOrchestrator {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        connector: Arc<ResourceConnector>,
        modules: Arc<ModuleManager>,
        status: Arc<StatusRegistry>,
    ) -> Self {
        Self {
            config,
            connector,
            modules,
            status,
            in_flight: Mutex::new(()),
            last_config: RwLock::new(None),
        }
    }

    /// Apply the current configuration now
    pub async fn reload(&self) -> ReloadOutcome {
        let _guard = self.in_flight.lock().await;
        info!("Reloading");
        let outcome = self.run(false).await;
        log_outcome("Reload", &outcome);
        outcome
    }

    /// Initial sequence at process start. Modules are always loaded.
    pub async fn startup(&self) -> ReloadOutcome {
        let _guard = self.in_flight.lock().await;
        info!("Starting up");
        let outcome = self.run(true).await;
        log_outcome("Startup", &outcome);
        outcome
    }

    /// Unload all modules, then close the store
    pub async fn shutdown(&self) {
        let _guard = self.in_flight.lock().await;
        info!("Shutting down");
        self.modules.unload_all().await;
        self.connector.disconnect().await;
    }

    /// Configuration applied by the most recent successful read
    pub fn last_config(&self) -> Option<CoreConfig> {
        self.last_config.read().clone()
    }

    async fn run(&self, startup: bool) -> ReloadOutcome {
        let started = Instant::now();
        let mut outcome = ReloadOutcome::new();

        let config = match self.config.load().await {
            Ok(config) => {
                self.status.remove_status(CONFIG_KEY);
                *self.last_config.write() = Some(config.clone());
                config
            }
            Err(e) => {
                error!("Failed to read configuration: {}", e);
                self.status.set_error(CONFIG_KEY, e.to_string());
                outcome.messages.push(format!("Configuration error: {}", e));
                outcome.config = ConfigStep::Failed(e.to_string());
                outcome.duration_ms = elapsed_ms(started);
                return outcome;
            }
        };

        outcome.store = self.reconcile_store(&config, &mut outcome.messages).await;
        outcome.modules = self
            .reconcile_modules(&config, startup, &mut outcome.messages)
            .await;

        outcome.duration_ms = elapsed_ms(started);
        outcome
    }

    async fn reconcile_store(&self, config: &CoreConfig, messages: &mut Vec<String>) -> StoreStep {
        if !config.database.enabled {
            let was_connected = self.connector.is_connected().await;
            self.connector.disable().await;
            return if was_connected {
                info!("Database disabled, connection closed");
                StoreStep::Disconnected
            } else {
                StoreStep::Disabled
            };
        }

        let connection = config.database.connection();
        let result = if !self.connector.is_connected().await {
            self.connector
                .connect(&connection)
                .await
                .map(|_| StoreStep::Connected)
        } else if self.connector.needs_reconnect(&connection).await {
            self.connector
                .reconnect(&connection)
                .await
                .map(|_| StoreStep::Reconnected)
        } else {
            Ok(StoreStep::Unchanged)
        };

        match result {
            Ok(step) => step,
            Err(e) => {
                messages.push(format!("Database error: {}", e));
                StoreStep::Failed(e.to_string())
            }
        }
    }

    async fn reconcile_modules(
        &self,
        config: &CoreConfig,
        startup: bool,
        messages: &mut Vec<String>,
    ) -> ModuleStep {
        let options = config.modules.staging_options();
        let report = if startup {
            self.modules.discover_and_load(&options).await
        } else if config.modules.auto_reload {
            self.modules.reload_all(&options).await
        } else {
            info!("Module auto-reload disabled, keeping running modules");
            return ModuleStep::Skipped;
        };

        collect_messages(&report, messages);
        if let Some(error) = report.aborted {
            return ModuleStep::Failed { error };
        }

        for record in self.modules.list_modules().await.values() {
            self.connector
                .record_module(&record.identity, &record.version, true)
                .await;
        }
        for (identity, _) in &report.failed {
            let version = PackageName::parse(identity)
                .version
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
            self.connector.record_module(identity, &version, false).await;
        }

        ModuleStep::Reloaded {
            loaded: report.loaded.len(),
            failed: report.failed.len(),
        }
    }
}

fn collect_messages(report: &LoadReport, messages: &mut Vec<String>) {
    for e in &report.staging.errors {
        messages.push(format!("Staging: {}", e));
    }
    for (identity, e) in &report.failed {
        messages.push(format!("Module {} failed: {}", identity, e));
    }
}

fn log_outcome(phase: &str, outcome: &ReloadOutcome) {
    if outcome.is_success() {
        info!(
            "{} complete in {}ms (store: {}, modules: {})",
            phase, outcome.duration_ms, outcome.store, outcome.modules
        );
    } else {
        warn!(
            "{} finished with errors in {}ms (config: {}, store: {}, modules: {})",
            phase, outcome.duration_ms, outcome.config, outcome.store, outcome.modules
        );
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
