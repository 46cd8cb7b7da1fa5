//! Configuration model
//!
//! Every field has a default, so a partial file (or an empty one) is valid.

use super::{ConfigError, ConfigResult};
use crate::modules::StagingOptions;
use crate::store::{ConnectionConfig, StoreDriver};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database: DatabaseSection,
    pub debug: DebugSection,
    pub modules: ModulesSection,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub enabled: bool,
    pub driver: StoreDriver,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub pool_min_size: u32,
    pub pool_max_size: u32,
    pub pool_idle_timeout_ms: u64,
    pub pool_max_lifetime_ms: u64,
    pub auto_create_tables: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            enabled: false,
            driver: StoreDriver::Mysql,
            host: "localhost".to_string(),
            port: 3306,
            database: "modkeeper".to_string(),
            username: "root".to_string(),
            password: String::new(),
            pool_min_size: 5,
            pool_max_size: 10,
            pool_idle_timeout_ms: 600_000,
            pool_max_lifetime_ms: 1_800_000,
            auto_create_tables: true,
        }
    }
}

impl std::fmt::Debug for DatabaseSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSection")
            .field("enabled", &self.enabled)
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("pool_min_size", &self.pool_min_size)
            .field("pool_max_size", &self.pool_max_size)
            .finish_non_exhaustive()
    }
}

impl DatabaseSection {
    /// Connection snapshot for the connector
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            driver: self.driver,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            pool_min_size: self.pool_min_size,
            pool_max_size: self.pool_max_size,
            idle_timeout: Duration::from_millis(self.pool_idle_timeout_ms),
            max_lifetime: Duration::from_millis(self.pool_max_lifetime_ms),
            auto_create_tables: self.auto_create_tables,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSection {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesSection {
    /// Reload modules on every global reload
    pub auto_reload: bool,
    /// Copy packages from the inbound directory
    pub auto_copy: bool,
    /// Delete older versions of a package when staging a new one
    pub delete_old_versions: bool,
    /// Stage packages without a `module.toml`
    pub allow_foreign_modules: bool,
    /// Host components to stage in addition to the inbound packages
    pub additional_modules: Vec<String>,
    pub package_extension: String,
}

impl Default for ModulesSection {
    fn default() -> Self {
        Self {
            auto_reload: true,
            auto_copy: true,
            delete_old_versions: true,
            allow_foreign_modules: false,
            additional_modules: Vec::new(),
            package_extension: "jar".to_string(),
        }
    }
}

impl ModulesSection {
    pub fn staging_options(&self) -> StagingOptions {
        StagingOptions {
            auto_copy: self.auto_copy,
            delete_old_versions: self.delete_old_versions,
            allow_foreign_modules: self.allow_foreign_modules,
            additional_modules: self.additional_modules.clone(),
        }
    }
}

impl CoreConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> ConfigResult<()> {
        let db = &self.database;
        if db.pool_max_size < 1 {
            return Err(ConfigError::Validation(
                "database.pool_max_size must be at least 1".to_string(),
            ));
        }
        if db.pool_min_size > db.pool_max_size {
            return Err(ConfigError::Validation(format!(
                "database.pool_min_size ({}) exceeds pool_max_size ({})",
                db.pool_min_size, db.pool_max_size
            )));
        }
        if db.database.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.database must not be empty".to_string(),
            ));
        }
        if db.driver.is_network() {
            if db.host.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "database.host must not be empty".to_string(),
                ));
            }
            if db.port == 0 {
                return Err(ConfigError::Validation(
                    "database.port must not be 0".to_string(),
                ));
            }
        }
        if self.modules.package_extension.trim().is_empty() {
            return Err(ConfigError::Validation(
                "modules.package_extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.database.enabled);
        assert!(config.modules.auto_reload);
        assert_eq!(config.modules.package_extension, "jar");
    }

    #[test]
    fn test_pool_bounds() {
        let mut config = CoreConfig::default();
        config.database.pool_min_size = 20;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.database.pool_min_size = 0;
        config.database.pool_max_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sqlite_ignores_network_fields() {
        let mut config = CoreConfig::default();
        config.database.driver = StoreDriver::Sqlite;
        config.database.host.clear();
        config.database.port = 0;
        config.database.database = "state.db".to_string();
        assert!(config.validate().is_ok());

        config.database.driver = StoreDriver::Postgres;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_conversion() {
        let mut section = DatabaseSection::default();
        section.password = "secret".to_string();
        let connection = section.connection();
        assert_eq!(connection.idle_timeout, Duration::from_secs(600));
        assert_eq!(connection.max_lifetime, Duration::from_secs(1800));
        assert_eq!(connection.password, "secret");
        assert!(!format!("{:?}", section).contains("secret"));
    }
}
