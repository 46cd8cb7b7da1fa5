//! Module manager
//!
//! Owns the set of loaded modules. The set is only mutated under the write
//! lock, and at most one record exists per package identity.

use super::error::{ModuleError, ModuleResult, StagingError};
use super::resolver::ComponentResolver;
use super::runtime::{ModuleHandle, ModuleRuntime};
use super::staging::{self, ModuleLayout, StagingOptions, StagingReport};
use crate::status::StatusRegistry;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// A loaded module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Package file name, e.g. `Foo-1.1.jar`
    pub identity: String,
    pub display_name: String,
    pub version: String,
    pub description: Option<String>,
    pub package: PathBuf,
    pub loaded_at: DateTime<Utc>,
    pub instance_id: String,
}

impl From<&ModuleHandle> for ModuleRecord {
    fn from(handle: &ModuleHandle) -> Self {
        Self {
            identity: handle.identity.clone(),
            display_name: handle.display_name.clone(),
            version: handle.version.clone(),
            description: handle.description.clone(),
            package: handle.package.clone(),
            loaded_at: Utc::now(),
            instance_id: handle.instance_id.clone(),
        }
    }
}

struct LoadedModule {
    record: ModuleRecord,
    handle: ModuleHandle,
}

/// Result of a discovery and load pass
#[derive(Debug, Default)]
pub struct LoadReport {
    pub staging: StagingReport,
    /// Identities loaded in this pass
    pub loaded: Vec<String>,
    /// Identity and error of every failed load
    pub failed: Vec<(String, ModuleError)>,
    /// Set when the managed directory could not be enumerated
    pub aborted: Option<String>,
}

impl LoadReport {
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

pub struct ModuleManager {
    layout: ModuleLayout,
    runtime: Arc<dyn ModuleRuntime>,
    resolver: Arc<dyn ComponentResolver>,
    status: Arc<StatusRegistry>,
    modules: RwLock<HashMap<String, LoadedModule>>,
    /// Identities whose last load failed, so their ERROR entries can be cleared
    failed: Mutex<HashSet<String>>,
}

impl ModuleManager {
    pub fn new(
        layout: ModuleLayout,
        runtime: Arc<dyn ModuleRuntime>,
        resolver: Arc<dyn ComponentResolver>,
        status: Arc<StatusRegistry>,
    ) -> Self {
        Self {
            layout,
            runtime,
            resolver,
            status,
            modules: RwLock::new(HashMap::new()),
            failed: Mutex::new(HashSet::new()),
        }
    }

    pub fn layout(&self) -> &ModuleLayout {
        &self.layout
    }

    /// Create the managed directory if it does not exist
    pub async fn ensure_managed_dir(&self) -> ModuleResult<()> {
        tokio::fs::create_dir_all(&self.layout.managed_dir).await?;
        Ok(())
    }

    /// Load a single package. An already loaded module with the same
    /// identity is unloaded first.
    pub async fn load(&self, package: &Path) -> ModuleResult<ModuleRecord> {
        let identity = package
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| ModuleError::NotFound(package.to_path_buf()))?;

        let mut modules = self.modules.write().await;

        if let Some(existing) = modules.remove(&identity) {
            debug!("Module {} already loaded, unloading first", identity);
            if let Err(e) = self.runtime.unload(&existing.handle).await {
                warn!("Failed to unload module {}: {}", identity, e);
            }
        }

        self.status.set_loading(&identity);
        info!("Loading module: {}", identity);

        match self.runtime.load(package).await {
            Ok(handle) => {
                let record = ModuleRecord::from(&handle);
                info!(
                    "Module {} loaded ({} {})",
                    identity, record.display_name, record.version
                );
                modules.insert(
                    identity.clone(),
                    LoadedModule {
                        record: record.clone(),
                        handle,
                    },
                );
                self.failed.lock().remove(&identity);
                self.status.set_ok(&identity);
                Ok(record)
            }
            Err(e) => {
                error!("Failed to load module {}: {}", identity, e);
                self.failed.lock().insert(identity.clone());
                self.status.set_error(&identity, e.to_string());
                Err(e)
            }
        }
    }

    /// Unload every module and drop their status entries, including the
    /// ERROR entries of failed loads. Returns how many modules were unloaded.
    pub async fn unload_all(&self) -> usize {
        let mut modules = self.modules.write().await;
        let count = modules.len();

        for (identity, module) in modules.drain() {
            debug!("Unloading module: {}", identity);
            if let Err(e) = self.runtime.unload(&module.handle).await {
                warn!("Failed to unload module {}: {}", identity, e);
            }
            self.status.unregister_module(&identity);
        }

        let failed: Vec<String> = self.failed.lock().drain().collect();
        for identity in failed {
            self.status.unregister_module(&identity);
        }

        if count > 0 {
            info!("Unloaded {} modules", count);
        }
        count
    }

    /// Copy inbound and additional packages into the managed directory
    pub async fn stage(&self, options: &StagingOptions) -> StagingReport {
        if let Err(e) = self.ensure_managed_dir().await {
            warn!("Cannot create module directory {:?}: {}", self.layout.managed_dir, e);
        }

        let layout = self.layout.clone();
        let options = options.clone();
        let resolver = self.resolver.clone();
        let task = tokio::task::spawn_blocking(move || {
            let additional: Vec<(String, Option<PathBuf>)> = options
                .additional_modules
                .iter()
                .map(|name| (name.clone(), resolver.resolve(name)))
                .collect();
            staging::stage(&layout, &options, &additional)
        });

        match task.await {
            Ok(report) => report,
            Err(e) => {
                error!("Staging task failed: {}", e);
                StagingReport {
                    errors: vec![StagingError::Task(e.to_string())],
                    ..Default::default()
                }
            }
        }
    }

    /// Stage, then load every package in the managed directory. One failed
    /// load never stops the others.
    pub async fn discover_and_load(&self, options: &StagingOptions) -> LoadReport {
        let mut report = LoadReport {
            staging: self.stage(options).await,
            ..Default::default()
        };

        let dir = self.layout.managed_dir.clone();
        let extension = self.layout.package_extension.clone();
        let packages =
            match tokio::task::spawn_blocking(move || staging::list_packages(&dir, &extension))
                .await
            {
                Ok(Ok(packages)) => packages,
                Ok(Err(e)) => {
                    error!("Cannot list managed modules: {}", e);
                    report.aborted = Some(e.to_string());
                    report.staging.errors.push(e);
                    return report;
                }
                Err(e) => {
                    report.aborted = Some(e.to_string());
                    report.staging.errors.push(StagingError::Task(e.to_string()));
                    return report;
                }
            };

        for package in packages {
            match self.load(&package).await {
                Ok(record) => report.loaded.push(record.identity),
                Err(e) => {
                    let identity = package
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    report.failed.push((identity, e));
                }
            }
        }

        info!(
            "Module pass complete: {} loaded, {} failed",
            report.loaded_count(),
            report.failed_count()
        );
        report
    }

    /// Unload everything, then run the full discovery and load sequence
    pub async fn reload_all(&self, options: &StagingOptions) -> LoadReport {
        info!("Reloading all modules");
        self.unload_all().await;
        self.discover_and_load(options).await
    }

    /// Copy of the loaded set keyed by identity
    pub async fn list_modules(&self) -> HashMap<String, ModuleRecord> {
        self.modules
            .read()
            .await
            .iter()
            .map(|(identity, module)| (identity.clone(), module.record.clone()))
            .collect()
    }

    pub async fn module_count(&self) -> usize {
        self.modules.read().await.len()
    }

    pub async fn is_loaded(&self, identity: &str) -> bool {
        self.modules.read().await.contains_key(identity)
    }
}
