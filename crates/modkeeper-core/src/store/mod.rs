//! Backing store connection management
//!
//! - [`ResourceConnector`]: owns the single connection pool
//! - [`ConnectionConfig`]: immutable connection parameters
//! - Best-effort bookkeeping of modules, peers and principals

mod connector;
mod error;
pub mod schema;
mod snapshot;

pub use connector::{
    ConnectionState, DEFAULT_PING_TIMEOUT, PresenceEvent, PrincipalPresence, ResourceConnector,
};
pub use error::{StoreError, StoreResult};
pub use snapshot::{ConnectionConfig, StoreDriver};
