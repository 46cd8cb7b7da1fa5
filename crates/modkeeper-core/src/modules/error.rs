use std::path::PathBuf;

/// Module load/unload error types
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("Package not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Invalid package {path:?}: {reason}")]
    InvalidPackage { path: PathBuf, reason: String },

    #[error("Invalid manifest in {path:?}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

pub type ModuleResult<T> = Result<T, ModuleError>;

/// Filesystem staging error types. Collected per file, never fatal to a pass.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Failed to read directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from:?} to {to:?}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path:?}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to inspect package {path:?}: {reason}")]
    Inspect { path: PathBuf, reason: String },

    #[error("Additional module not found: {0}")]
    Unresolved(String),

    #[error("Staging task failed: {0}")]
    Task(String),
}
