//! Module discovery, staging and lifecycle
//!
//! - Staging: copy-in from the inbound directory with stale-version pruning
//! - Load/unload through a pluggable [`ModuleRuntime`]
//! - Status reporting into the shared registry
//! - A read-only inventory of both directories

mod error;
mod inventory;
mod manager;
pub mod package;
mod resolver;
mod runtime;
pub mod staging;

pub use error::{ModuleError, ModuleResult, StagingError};
pub use inventory::{Inventory, ManagedPackage, inventory};
pub use manager::{LoadReport, ModuleManager, ModuleRecord};
pub use package::{ModuleManifest, PackageInfo, PackageName};
pub use resolver::{ComponentResolver, DirectoryComponentIndex, StaticComponentIndex};
pub use runtime::{ManifestRuntime, ModuleHandle, ModuleRuntime, ModuleState};
pub use staging::{ModuleLayout, StagingOptions, StagingReport};
