//! Reload results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration re-read result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "error", rename_all = "snake_case")]
pub enum ConfigStep {
    Loaded,
    Failed(String),
}

/// Store reconciliation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "error", rename_all = "snake_case")]
pub enum StoreStep {
    /// Was disconnected, now connected
    Connected,
    /// Configuration changed, pool rebuilt
    Reconnected,
    /// Connected with the same configuration
    Unchanged,
    /// Store disabled while connected
    Disconnected,
    /// Store disabled and not connected
    Disabled,
    Failed(String),
    /// Not attempted because configuration could not be read
    Skipped,
}

/// Module reconciliation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ModuleStep {
    Reloaded { loaded: usize, failed: usize },
    /// Auto-reload disabled or configuration unreadable; modules keep running
    Skipped,
    Failed { error: String },
}

/// Aggregate result of a reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadOutcome {
    pub config: ConfigStep,
    pub store: StoreStep,
    pub modules: ModuleStep,
    /// Diagnostics collected along the way
    pub messages: Vec<String>,
    pub duration_ms: u64,
}

impl ReloadOutcome {
    pub(crate) fn new() -> Self {
        Self {
            config: ConfigStep::Loaded,
            store: StoreStep::Skipped,
            modules: ModuleStep::Skipped,
            messages: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn config_ok(&self) -> bool {
        self.config == ConfigStep::Loaded
    }

    pub fn store_ok(&self) -> bool {
        !matches!(self.store, StoreStep::Failed(_))
    }

    pub fn modules_ok(&self) -> bool {
        match self.modules {
            ModuleStep::Reloaded { failed, .. } => failed == 0,
            ModuleStep::Skipped => true,
            ModuleStep::Failed { .. } => false,
        }
    }

    /// Every step succeeded
    pub fn is_success(&self) -> bool {
        self.config_ok() && self.store_ok() && self.modules_ok()
    }
}

impl fmt::Display for StoreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreStep::Connected => write!(f, "connected"),
            StoreStep::Reconnected => write!(f, "reconnected"),
            StoreStep::Unchanged => write!(f, "unchanged"),
            StoreStep::Disconnected => write!(f, "disconnected"),
            StoreStep::Disabled => write!(f, "disabled"),
            StoreStep::Failed(e) => write!(f, "failed: {}", e),
            StoreStep::Skipped => write!(f, "skipped"),
        }
    }
}

impl fmt::Display for ModuleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleStep::Reloaded { loaded, failed } => {
                write!(f, "{} loaded, {} failed", loaded, failed)
            }
            ModuleStep::Skipped => write!(f, "skipped"),
            ModuleStep::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigStep::Loaded => write!(f, "loaded"),
            ConfigStep::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_flags() {
        let mut outcome = ReloadOutcome::new();
        assert!(outcome.is_success());

        outcome.modules = ModuleStep::Reloaded { loaded: 2, failed: 1 };
        assert!(!outcome.modules_ok());
        assert!(outcome.store_ok());

        outcome.store = StoreStep::Failed("refused".to_string());
        assert!(!outcome.store_ok());
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_serializes_with_result_tag() {
        let mut outcome = ReloadOutcome::new();
        outcome.store = StoreStep::Failed("refused".to_string());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["store"]["result"], "failed");
        assert_eq!(json["store"]["error"], "refused");
        assert_eq!(json["config"]["result"], "loaded");
    }
}
