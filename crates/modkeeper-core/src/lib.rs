//! modkeeper core
//!
//! Extension lifecycle coordination for a host application:
//!
//! - [`status`]: process-wide component status registry
//! - [`store`]: pooled backing-store connection with reconnect detection
//! - [`modules`]: package staging, load/unload and status reporting
//! - [`reload`]: ordered, serialized reconciliation against live configuration
//! - [`coordinator`]: wiring of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use modkeeper_core::prelude::*;
//! use std::sync::Arc;
//!
//! let layout = ModuleLayout::new("plugins", "modules");
//! let config = Arc::new(FileConfigSource::new("config.toml"));
//! let coordinator = Coordinator::new(layout, config);
//!
//! coordinator.start().await;
//! let outcome = coordinator.reload().await;
//! println!("store ok: {}", outcome.store_ok());
//! coordinator.shutdown().await;
//! ```

pub mod config;
pub mod coordinator;
pub mod modules;
pub mod reload;
pub mod status;
pub mod store;

pub use coordinator::{Coordinator, CoordinatorBuilder, InspectionReport, StatusReport};

pub mod prelude {
    pub use crate::config::{
        ConfigError, ConfigSource, CoreConfig, FileConfigSource, StaticConfigSource,
        write_default_config,
    };
    pub use crate::coordinator::{Coordinator, InspectionReport, StatusReport};
    pub use crate::modules::{
        ComponentResolver, ManifestRuntime, ModuleLayout, ModuleManager, ModuleRecord,
        ModuleRuntime, StagingOptions,
    };
    pub use crate::reload::{ModuleStep, ReloadOrchestrator, ReloadOutcome, StoreStep};
    pub use crate::status::{Status, StatusRegistry};
    pub use crate::store::{ConnectionConfig, ResourceConnector, StoreDriver};
}
