use std::time::Duration;

/// Resource connector error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Pool could not be built from the configuration
    #[error("Pool build error: {0}")]
    Build(String),

    /// Liveness check failed
    #[error("Connection error: {0}")]
    Ping(String),

    #[error("Connection check timed out after {0:?}")]
    Timeout(Duration),

    /// Table provisioning failed
    #[error("Schema error: {0}")]
    Schema(String),

    /// `acquire` was called before any connect was requested, or after the
    /// store was disabled
    #[error("Store is not configured")]
    NotConfigured,
}

pub type StoreResult<T> = Result<T, StoreError>;
