//! Module execution capability
//!
//! Actually running module code is the host's business. The manager only
//! talks to a [`ModuleRuntime`]; [`ManifestRuntime`] is the default and
//! records modules from their manifest without executing anything.

use super::error::{ModuleError, ModuleResult};
use super::package;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Live state of a module instance as seen by its runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Active,
    Unloaded,
}

/// Handle to a module instance created by a runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleHandle {
    /// Unique per load, so a reloaded module gets a fresh id
    pub instance_id: String,
    /// Package file name
    pub identity: String,
    pub package: PathBuf,
    pub display_name: String,
    pub version: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait ModuleRuntime: Send + Sync {
    /// Bring up the module contained in `package`
    async fn load(&self, package: &Path) -> ModuleResult<ModuleHandle>;

    /// Shut the module down
    async fn unload(&self, handle: &ModuleHandle) -> ModuleResult<()>;

    fn status(&self, handle: &ModuleHandle) -> ModuleState;
}

/// Runtime that reads the package manifest and tracks live handles
#[derive(Debug, Default)]
pub struct ManifestRuntime {
    live: DashMap<String, ModuleHandle>,
}

impl ManifestRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles not yet unloaded
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    fn describe(package: &Path) -> ModuleResult<ModuleHandle> {
        let info = package::describe(package)?;
        Ok(ModuleHandle {
            instance_id: uuid::Uuid::now_v7().to_string(),
            identity: info.identity,
            package: package.to_path_buf(),
            display_name: info.display_name,
            version: info.version,
            description: info.description,
        })
    }
}

#[async_trait]
impl ModuleRuntime for ManifestRuntime {
    async fn load(&self, package: &Path) -> ModuleResult<ModuleHandle> {
        let path = package.to_path_buf();
        let handle = tokio::task::spawn_blocking(move || Self::describe(&path))
            .await
            .map_err(|e| ModuleError::Task(e.to_string()))??;

        debug!(
            "Module {} ({}) registered as {}",
            handle.display_name, handle.version, handle.instance_id
        );
        self.live.insert(handle.instance_id.clone(), handle.clone());
        Ok(handle)
    }

    async fn unload(&self, handle: &ModuleHandle) -> ModuleResult<()> {
        match self.live.remove(&handle.instance_id) {
            Some(_) => Ok(()),
            None => Err(ModuleError::Runtime(format!(
                "instance {} of {} is not live",
                handle.instance_id, handle.identity
            ))),
        }
    }

    fn status(&self, handle: &ModuleHandle) -> ModuleState {
        if self.live.contains_key(&handle.instance_id) {
            ModuleState::Active
        } else {
            ModuleState::Unloaded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::package::UNKNOWN_VERSION;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn package_with(path: &Path, manifest: Option<&str>) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        match manifest {
            Some(content) => {
                zip.start_file(package::MANIFEST_ENTRY, SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            None => {
                zip.start_file("plugin.yml", SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(b"name: x\n").unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_manifest_values_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Economy-1.0.jar");
        package_with(
            &path,
            Some("name = \"Economy\"\nversion = \"1.0.3\"\ndescription = \"Coins\"\n"),
        );

        let runtime = ManifestRuntime::new();
        let handle = runtime.load(&path).await.unwrap();

        assert_eq!(handle.identity, "Economy-1.0.jar");
        assert_eq!(handle.display_name, "Economy");
        assert_eq!(handle.version, "1.0.3");
        assert_eq!(handle.description.as_deref(), Some("Coins"));
        assert_eq!(runtime.status(&handle), ModuleState::Active);
    }

    #[tokio::test]
    async fn test_placeholders_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let versioned = dir.path().join("Other-2.1.jar");
        let bare = dir.path().join("Other.jar");
        package_with(&versioned, None);
        package_with(&bare, None);

        let runtime = ManifestRuntime::new();
        let handle = runtime.load(&versioned).await.unwrap();
        assert_eq!(handle.display_name, "Other");
        assert_eq!(handle.version, "2.1");

        let handle = runtime.load(&bare).await.unwrap();
        assert_eq!(handle.version, UNKNOWN_VERSION);
    }

    #[tokio::test]
    async fn test_unload_releases_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo-1.0.jar");
        package_with(&path, Some("name = \"Foo\"\n"));

        let runtime = ManifestRuntime::new();
        let handle = runtime.load(&path).await.unwrap();
        assert_eq!(runtime.live_count(), 1);

        runtime.unload(&handle).await.unwrap();
        assert_eq!(runtime.live_count(), 0);
        assert_eq!(runtime.status(&handle), ModuleState::Unloaded);
        assert!(runtime.unload(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_broken_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bad-1.0.jar");
        package_with(&path, Some("name = [unterminated"));

        let runtime = ManifestRuntime::new();
        assert!(matches!(
            runtime.load(&path).await,
            Err(ModuleError::Manifest { .. })
        ));
        assert_eq!(runtime.live_count(), 0);
    }
}
