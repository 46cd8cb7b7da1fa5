//! Component status registry
//!
//! Single source of truth for "is component X healthy", decoupled from
//! whatever owns X. Modules, the database connector and the configuration
//! layer all report here under their own keys.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Status key used by the resource connector
pub const DATABASE_KEY: &str = "database";

/// Status key used by the reload orchestrator for configuration reads
pub const CONFIG_KEY: &str = "config";

/// Health of a tracked component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Warning,
    Error,
    Loading,
    /// Implicit value for keys that were never written
    #[default]
    Unknown,
}

impl Status {
    /// Whether this status counts as "enabled" for reporting
    pub fn is_enabled(self) -> bool {
        self == Status::Ok
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Warning => write!(f, "WARNING"),
            Status::Error => write!(f, "ERROR"),
            Status::Loading => write!(f, "LOADING"),
            Status::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A component's health record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: Status,
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StatusEntry {
    fn new(status: Status, message: Option<String>) -> Self {
        Self {
            status,
            message,
            updated_at: Utc::now(),
        }
    }
}

/// Projection of a status entry used by external module reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleView {
    pub name: String,
    pub enabled: bool,
}

/// Concurrent status registry.
///
/// Writers to different keys never contend on a shared lock; writes to the
/// same key are last-write-wins.
#[derive(Debug, Default)]
pub struct StatusRegistry {
    entries: DashMap<String, StatusEntry>,
}

impl StatusRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the status of a component
    pub fn set_status(&self, key: &str, status: Status, message: Option<String>) {
        debug!("Status {} -> {}", key, status);
        self.entries
            .insert(key.to_string(), StatusEntry::new(status, message));
    }

    pub fn set_ok(&self, key: &str) {
        self.set_status(key, Status::Ok, None);
    }

    pub fn set_warning(&self, key: &str, message: impl Into<String>) {
        self.set_status(key, Status::Warning, Some(message.into()));
    }

    pub fn set_error(&self, key: &str, message: impl Into<String>) {
        self.set_status(key, Status::Error, Some(message.into()));
    }

    pub fn set_loading(&self, key: &str) {
        self.set_status(key, Status::Loading, None);
    }

    /// Status of a component, `Unknown` if never written
    pub fn get_status(&self, key: &str) -> Status {
        self.entries
            .get(key)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    /// Message attached to a component's status, if any
    pub fn get_message(&self, key: &str) -> Option<String> {
        self.entries.get(key).and_then(|entry| entry.message.clone())
    }

    /// Full entry for a component
    pub fn entry(&self, key: &str) -> Option<StatusEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    pub fn has_status(&self, key: &str, status: Status) -> bool {
        self.get_status(key) == status
    }

    /// Remove a component's entry. No-op if absent.
    pub fn remove_status(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            debug!("Status {} removed", key);
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of components currently `Ok`
    pub fn count_enabled(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status.is_enabled())
            .count()
    }

    /// Number of tracked components
    pub fn count_total(&self) -> usize {
        self.entries.len()
    }

    /// Register a module as enabled (`Ok`) or failed (`Error`)
    pub fn register_module(&self, name: &str, enabled: bool) {
        let status = if enabled { Status::Ok } else { Status::Error };
        self.set_status(name, status, None);
    }

    pub fn unregister_module(&self, name: &str) {
        self.remove_status(name);
    }

    pub fn is_module_enabled(&self, name: &str) -> bool {
        self.get_status(name).is_enabled()
    }

    /// Name/enabled projection of a single entry
    pub fn module_view(&self, key: &str) -> Option<ModuleView> {
        self.entries.get(key).map(|entry| ModuleView {
            name: key.to_string(),
            enabled: entry.status.is_enabled(),
        })
    }

    /// Name -> enabled for every tracked component
    pub fn module_views(&self) -> BTreeMap<String, bool> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.status.is_enabled()))
            .collect()
    }

    /// Sorted copy of all entries
    pub fn snapshot(&self) -> BTreeMap<String, StatusEntry> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
