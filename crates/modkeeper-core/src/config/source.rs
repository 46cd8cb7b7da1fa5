//! Configuration sources
//!
//! The reload orchestrator re-reads configuration through a [`ConfigSource`]
//! on every reload, so file edits take effect without a restart.

use super::{ConfigError, ConfigResult, CoreConfig, detect_format, parse_config};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix for `MODKEEPER_<SECTION>__<KEY>` environment overrides
pub const DEFAULT_ENV_PREFIX: &str = "MODKEEPER";

/// Configuration written on first start
pub const DEFAULT_CONFIG: &str = r#"# modkeeper configuration

[database]
# Track modules, peers and principals in a database
enabled = false
# mysql | postgres | sqlite (for sqlite, `database` is a file path)
driver = "mysql"
host = "localhost"
port = 3306
database = "modkeeper"
username = "root"
password = ""
pool_min_size = 5
pool_max_size = 10
pool_idle_timeout_ms = 600000
pool_max_lifetime_ms = 1800000
auto_create_tables = true

[debug]
enabled = false

[modules]
# Reload all modules on every global reload
auto_reload = true
# Copy packages from the inbound directory into the module directory
auto_copy = true
# Delete older versions of a package when a new one is staged
delete_old_versions = true
# Also stage packages that carry no module.toml
allow_foreign_modules = false
# Host components to stage in addition to inbound packages
additional_modules = []
package_extension = "jar"
"#;

/// Where the current configuration comes from
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> ConfigResult<CoreConfig>;
}

/// Configuration file on disk (TOML, YAML or JSON)
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
    env_prefix: Option<String>,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }

    /// Use a different prefix for environment overrides
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Ignore environment overrides
    pub fn without_env_overrides(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> ConfigResult<CoreConfig> {
        let format = detect_format(&self.path)?;
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.path.display(), e)))?;

        debug!("Loading configuration from {:?}", self.path);
        parse_config(&content, format, self.env_prefix.as_deref())
    }
}

/// In-memory configuration
#[derive(Debug)]
pub struct StaticConfigSource {
    current: RwLock<ConfigResult<CoreConfig>>,
}

impl StaticConfigSource {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            current: RwLock::new(Ok(config)),
        }
    }

    /// Replace the configuration returned by subsequent loads
    pub fn set(&self, config: CoreConfig) {
        *self.current.write() = Ok(config);
    }

    /// Make subsequent loads fail with `error` until the next `set`
    pub fn set_error(&self, error: ConfigError) {
        *self.current.write() = Err(error);
    }

    /// Apply `f` to the current configuration. No-op while an error is set.
    pub fn update(&self, f: impl FnOnce(&mut CoreConfig)) {
        if let Ok(config) = self.current.write().as_mut() {
            f(config);
        }
    }
}

impl Default for StaticConfigSource {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn load(&self) -> ConfigResult<CoreConfig> {
        let config = self.current.read().clone()?;
        config.validate()?;
        Ok(config)
    }
}

/// Write [`DEFAULT_CONFIG`] to `path` unless a file already exists there.
///
/// Returns whether a file was written.
pub fn write_default_config(path: &Path) -> ConfigResult<bool> {
    if path.exists() {
        debug!("Configuration already present at {:?}", path);
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    info!("Wrote default configuration to {:?}", path);
    Ok(true)
}
