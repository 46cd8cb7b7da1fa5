//! Reload orchestration

mod orchestrator;
mod outcome;

pub use orchestrator::ReloadOrchestrator;
pub use outcome::{ConfigStep, ModuleStep, ReloadOutcome, StoreStep};
