//! Connection parameters
//!
//! A [`ConnectionConfig`] is an immutable value. The connector keeps the one
//! used by the last successful connect and compares incoming configurations
//! against it to decide whether a reconnect is required.

use super::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Backing store flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreDriver {
    #[default]
    Mysql,
    Postgres,
    Sqlite,
}

impl StoreDriver {
    pub fn scheme(self) -> &'static str {
        match self {
            StoreDriver::Mysql => "mysql",
            StoreDriver::Postgres => "postgres",
            StoreDriver::Sqlite => "sqlite",
        }
    }

    /// Whether the driver talks to a server over the network
    pub fn is_network(self) -> bool {
        !matches!(self, StoreDriver::Sqlite)
    }

    pub fn default_port(self) -> u16 {
        match self {
            StoreDriver::Mysql => 3306,
            StoreDriver::Postgres => 5432,
            StoreDriver::Sqlite => 0,
        }
    }
}

impl fmt::Display for StoreDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Connection parameters for the backing store.
///
/// For SQLite, `database` is a file path (or `:memory:`) and the network
/// fields are ignored.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub driver: StoreDriver,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub pool_min_size: u32,
    pub pool_max_size: u32,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub auto_create_tables: bool,
}

impl ConnectionConfig {
    /// Network connection with pool defaults
    pub fn new(
        driver: StoreDriver,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            host: host.into(),
            port,
            database: database.into(),
            ..Self::default()
        }
    }

    /// SQLite database at `path`
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: StoreDriver::Sqlite,
            host: String::new(),
            port: 0,
            database: path.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_pool_size(mut self, min: u32, max: u32) -> Self {
        self.pool_min_size = min;
        self.pool_max_size = max;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    pub fn with_auto_create_tables(mut self, enabled: bool) -> Self {
        self.auto_create_tables = enabled;
        self
    }

    /// Connection URL understood by the `sqlx` Any driver
    pub fn url(&self) -> StoreResult<String> {
        if self.driver == StoreDriver::Sqlite {
            if self.database == ":memory:" {
                return Ok("sqlite::memory:".to_string());
            }
            return Ok(format!("sqlite://{}?mode=rwc", self.database));
        }

        let base = format!("{}://{}:{}/", self.driver.scheme(), self.host, self.port);
        let mut url = Url::parse(&base)
            .map_err(|e| StoreError::Build(format!("invalid address {}: {}", base, e)))?;

        if !self.username.is_empty() {
            url.set_username(&self.username)
                .map_err(|_| StoreError::Build("invalid username".to_string()))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| StoreError::Build("invalid password".to_string()))?;
        }
        url.set_path(&format!("/{}", self.database));

        Ok(url.to_string())
    }

    /// Human-readable target without credentials
    pub fn target(&self) -> String {
        match self.driver {
            StoreDriver::Sqlite => format!("sqlite:{}", self.database),
            driver => format!("{}://{}:{}/{}", driver, self.host, self.port, self.database),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: StoreDriver::Mysql,
            host: "localhost".to_string(),
            port: StoreDriver::Mysql.default_port(),
            database: "modkeeper".to_string(),
            username: "root".to_string(),
            password: String::new(),
            pool_min_size: 5,
            pool_max_size: 10,
            idle_timeout: Duration::from_millis(600_000),
            max_lifetime: Duration::from_millis(1_800_000),
            auto_create_tables: true,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("pool_min_size", &self.pool_min_size)
            .field("pool_max_size", &self.pool_max_size)
            .field("idle_timeout", &self.idle_timeout)
            .field("max_lifetime", &self.max_lifetime)
            .field("auto_create_tables", &self.auto_create_tables)
            .finish()
    }
}
