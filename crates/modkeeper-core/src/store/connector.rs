//! Pooled connection owner
//!
//! The connector is the only component that builds or closes a pool. It
//! keeps the configuration of the last successful connect so reloads can
//! tell whether anything changed.

use super::error::{StoreError, StoreResult};
use super::schema;
use super::snapshot::{ConnectionConfig, StoreDriver};
use crate::status::{DATABASE_KEY, StatusRegistry};
use serde::{Deserialize, Serialize};
use sqlx::any::{Any, AnyPoolOptions};
use sqlx::{AnyPool, Connection};
use sqlx::pool::PoolConnection;
use std::fmt;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default bound on the liveness check
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

static INSTALL_DRIVERS: Once = Once::new();

/// Connector lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Whether a principal arrived or departed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceEvent {
    Joined,
    Left,
}

/// A principal's presence change on a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalPresence {
    pub id: Uuid,
    pub name: String,
    pub peer: String,
    pub event: PresenceEvent,
}

impl PrincipalPresence {
    pub fn joined(id: Uuid, name: impl Into<String>, peer: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            peer: peer.into(),
            event: PresenceEvent::Joined,
        }
    }

    pub fn left(id: Uuid, name: impl Into<String>, peer: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            peer: peer.into(),
            event: PresenceEvent::Left,
        }
    }
}

struct ConnectorInner {
    state: ConnectionState,
    pool: Option<AnyPool>,
    snapshot: Option<ConnectionConfig>,
    last_requested: Option<ConnectionConfig>,
}

/// Owner of the single connection pool to the backing store
///
/// `inner` is only ever held for field swaps, never across pool building or
/// the liveness check, so bookkeeping writes never wait on a connect.
/// `lifecycle` serializes connect, disconnect and disable.
pub struct ResourceConnector {
    inner: RwLock<ConnectorInner>,
    lifecycle: Mutex<()>,
    status: Arc<StatusRegistry>,
    ping_timeout: Duration,
}

impl ResourceConnector {
    pub fn new(status: Arc<StatusRegistry>) -> Self {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        Self {
            inner: RwLock::new(ConnectorInner {
                state: ConnectionState::Disconnected,
                pool: None,
                snapshot: None,
                last_requested: None,
            }),
            lifecycle: Mutex::new(()),
            status,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    /// Bound used for the liveness check and pool acquisition
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Build a pool from `config`, verify it and provision tables.
    ///
    /// Any pool still held is closed first. On failure the snapshot is left
    /// untouched and the connector ends up disconnected.
    pub async fn connect(&self, config: &ConnectionConfig) -> StoreResult<()> {
        let _lifecycle = self.lifecycle.lock().await;

        let previous = {
            let mut inner = self.inner.write().await;
            inner.last_requested = Some(config.clone());
            inner.state = ConnectionState::Connecting;
            inner.pool.take()
        };
        if let Some(pool) = previous {
            debug!("Closing previous pool before connect");
            pool.close().await;
        }

        info!("Connecting to {}", config.target());
        let opened = self.open(config).await;

        let mut inner = self.inner.write().await;
        match opened {
            Ok(pool) => {
                inner.pool = Some(pool);
                inner.snapshot = Some(config.clone());
                inner.state = ConnectionState::Connected;
                self.status.set_ok(DATABASE_KEY);
                info!("Connected to {}", config.target());
                Ok(())
            }
            Err(e) => {
                inner.state = ConnectionState::Disconnected;
                self.status.set_error(DATABASE_KEY, e.to_string());
                error!("Failed to connect to {}: {}", config.target(), e);
                Err(e)
            }
        }
    }

    /// Close the pool if one is open. Idempotent.
    ///
    /// The last requested configuration is kept, so [`acquire`](Self::acquire)
    /// can connect again.
    pub async fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.close(false).await;
    }

    /// Close the pool and forget the requested configuration.
    ///
    /// Used when the configuration turns the store off. Until the next
    /// explicit [`connect`](Self::connect), `acquire` fails with
    /// [`StoreError::NotConfigured`].
    pub async fn disable(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.close(true).await;
    }

    async fn close(&self, forget: bool) {
        let pool = {
            let mut inner = self.inner.write().await;
            inner.state = ConnectionState::Disconnected;
            if forget {
                inner.last_requested = None;
            }
            inner.pool.take()
        };
        if let Some(pool) = pool {
            pool.close().await;
            info!("Database connection closed");
        }
        self.status.remove_status(DATABASE_KEY);
    }

    /// Disconnect, then connect with `config`
    pub async fn reconnect(&self, config: &ConnectionConfig) -> StoreResult<()> {
        info!("Reconnecting database");
        self.disconnect().await;
        self.connect(config).await
    }

    /// Whether `config` differs from the last successfully applied one
    pub async fn needs_reconnect(&self, config: &ConnectionConfig) -> bool {
        match &self.inner.read().await.snapshot {
            Some(snapshot) => snapshot != config,
            None => true,
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.state == ConnectionState::Connected
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.read().await.state
    }

    /// Configuration of the last successful connect
    pub async fn snapshot(&self) -> Option<ConnectionConfig> {
        self.inner.read().await.snapshot.clone()
    }

    /// Obtain a pooled connection, connecting with the most recently
    /// requested configuration if needed
    pub async fn acquire(&self) -> StoreResult<PoolConnection<Any>> {
        let pool = match self.live_pool().await {
            Some(pool) => pool,
            None => {
                let config = self
                    .inner
                    .read()
                    .await
                    .last_requested
                    .clone()
                    .ok_or(StoreError::NotConfigured)?;
                self.connect(&config).await?;
                self.live_pool().await.ok_or(StoreError::NotConfigured)?
            }
        };

        pool.acquire()
            .await
            .map_err(|e| StoreError::Ping(e.to_string()))
    }

    /// Upsert a module row. Best-effort.
    pub async fn record_module(&self, name: &str, version: &str, enabled: bool) {
        let Some((pool, driver)) = self.bookkeeping_pool().await else {
            debug!("Skipping module record for {}: not connected", name);
            return;
        };

        let result = sqlx::query(&schema::upsert_module(driver))
            .bind(name.to_string())
            .bind(version.to_string())
            .bind(enabled)
            .bind(now_millis())
            .execute(&pool)
            .await;

        if let Err(e) = result {
            warn!("Failed to record module {}: {}", name, e);
        }
    }

    /// Upsert a peer row. Best-effort.
    pub async fn record_peer(&self, name: &str, address: &str, status: &str) {
        let Some((pool, driver)) = self.bookkeeping_pool().await else {
            debug!("Skipping peer record for {}: not connected", name);
            return;
        };

        let result = sqlx::query(&schema::upsert_peer(driver))
            .bind(name.to_string())
            .bind(address.to_string())
            .bind(status.to_string())
            .bind(now_millis())
            .execute(&pool)
            .await;

        if let Err(e) = result {
            warn!("Failed to record peer {}: {}", name, e);
        }
    }

    /// Track a principal joining or leaving a peer. Best-effort.
    pub async fn record_principal(&self, presence: &PrincipalPresence) {
        let Some((pool, driver)) = self.bookkeeping_pool().await else {
            debug!("Skipping principal record for {}: not connected", presence.id);
            return;
        };

        let result = match presence.event {
            PresenceEvent::Joined => {
                let now = now_millis();
                sqlx::query(&schema::upsert_principal(driver))
                    .bind(presence.id.to_string())
                    .bind(presence.name.clone())
                    .bind(now)
                    .bind(now)
                    .bind(presence.peer.clone())
                    .execute(&pool)
                    .await
            }
            PresenceEvent::Left => {
                sqlx::query(&schema::update_principal_peer(driver))
                    .bind(presence.peer.clone())
                    .bind(presence.id.to_string())
                    .execute(&pool)
                    .await
            }
        };

        if let Err(e) = result {
            warn!("Failed to record principal {}: {}", presence.name, e);
        }
    }

    async fn live_pool(&self) -> Option<AnyPool> {
        let inner = self.inner.read().await;
        match inner.state {
            ConnectionState::Connected => inner.pool.clone(),
            _ => None,
        }
    }

    async fn bookkeeping_pool(&self) -> Option<(AnyPool, StoreDriver)> {
        let inner = self.inner.read().await;
        if inner.state != ConnectionState::Connected {
            return None;
        }
        let driver = inner.snapshot.as_ref()?.driver;
        inner.pool.clone().map(|pool| (pool, driver))
    }

    async fn open(&self, config: &ConnectionConfig) -> StoreResult<AnyPool> {
        let url = config.url()?;
        let pool = AnyPoolOptions::new()
            .min_connections(config.pool_min_size)
            .max_connections(config.pool_max_size)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .acquire_timeout(self.ping_timeout)
            .connect_lazy(&url)
            .map_err(|e| StoreError::Build(e.to_string()))?;

        if let Err(e) = self.verify(&pool, config).await {
            pool.close().await;
            return Err(e);
        }

        Ok(pool)
    }

    async fn verify(&self, pool: &AnyPool, config: &ConnectionConfig) -> StoreResult<()> {
        let ping = async {
            let mut conn = pool.acquire().await?;
            conn.ping().await?;
            Ok::<(), sqlx::Error>(())
        };

        match tokio::time::timeout(self.ping_timeout, ping).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(StoreError::Ping(e.to_string())),
            Err(_) => return Err(StoreError::Timeout(self.ping_timeout)),
        }

        if config.auto_create_tables {
            for statement in schema::create_tables(config.driver) {
                sqlx::query(&statement)
                    .execute(pool)
                    .await
                    .map_err(|e| StoreError::Schema(e.to_string()))?;
            }
            debug!("Bookkeeping tables ready");
        }

        Ok(())
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
