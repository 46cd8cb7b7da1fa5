//! Shared fixtures for the modkeeper-core integration tests.

#![allow(dead_code)]

use modkeeper_core::config::{CoreConfig, StaticConfigSource};
use modkeeper_core::modules::{ModuleLayout, package::MANIFEST_ENTRY};
use modkeeper_core::store::StoreDriver;
use modkeeper_core::{Coordinator, CoordinatorBuilder};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// A package carrying a `module.toml`
pub fn write_module(path: &Path, name: &str, version: &str) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(MANIFEST_ENTRY, SimpleFileOptions::default())
        .unwrap();
    write!(zip, "name = \"{}\"\nversion = \"{}\"\n", name, version).unwrap();
    zip.finish().unwrap();
}

/// A zip package without a manifest
pub fn write_foreign(path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("plugin.yml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"name: foreign\n").unwrap();
    zip.finish().unwrap();
}

/// A file that is not a zip archive and will fail to load
pub fn write_garbage(path: &Path) {
    std::fs::write(path, b"definitely not a zip").unwrap();
}

/// Isolated directories, an in-memory config and a coordinator over them
pub struct Fixture {
    pub dir: TempDir,
    pub layout: ModuleLayout,
    pub config: Arc<StaticConfigSource>,
    pub coordinator: Coordinator,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    pub fn with(customize: impl FnOnce(CoordinatorBuilder) -> CoordinatorBuilder) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = ModuleLayout::new(dir.path().join("plugins"), dir.path().join("modules"));
        std::fs::create_dir_all(&layout.inbound_dir).unwrap();
        std::fs::create_dir_all(&layout.managed_dir).unwrap();

        let config = Arc::new(StaticConfigSource::new(CoreConfig::default()));
        let builder = Coordinator::builder(layout.clone(), config.clone())
            .with_ping_timeout(Duration::from_secs(2));
        let coordinator = customize(builder).build();

        Self {
            dir,
            layout,
            config,
            coordinator,
        }
    }

    pub fn inbound(&self, file_name: &str) -> PathBuf {
        self.layout.inbound_dir.join(file_name)
    }

    pub fn managed(&self, file_name: &str) -> PathBuf {
        self.layout.managed_dir.join(file_name)
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("state.db")
    }

    /// Point the store at a SQLite file inside the fixture directory
    pub fn enable_sqlite(&self) {
        let path = self.db_path().to_string_lossy().to_string();
        self.config.update(|c| {
            c.database.enabled = true;
            c.database.driver = StoreDriver::Sqlite;
            c.database.database = path;
            c.database.pool_min_size = 1;
            c.database.pool_max_size = 2;
        });
    }

    /// Point the store at a SQLite file that cannot be created
    pub fn break_sqlite(&self) {
        let path = self
            .dir
            .path()
            .join("missing/nested/state.db")
            .to_string_lossy()
            .to_string();
        self.config.update(|c| {
            c.database.enabled = true;
            c.database.driver = StoreDriver::Sqlite;
            c.database.database = path;
            c.database.pool_min_size = 1;
            c.database.pool_max_size = 2;
        });
    }

    pub fn managed_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.layout.managed_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Read-only pool on the fixture's SQLite file
    pub async fn sqlite(&self) -> sqlx::SqlitePool {
        sqlx::SqlitePool::connect(&format!("sqlite://{}", self.db_path().display()))
            .await
            .unwrap()
    }
}
