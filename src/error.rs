//! Error types for the charity registry

use std::path::PathBuf;

use thiserror::Error;

use crate::identity::Identity;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Charity registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Charity {id} is already deleted")]
    AlreadyDeleted { id: u64 },

    #[error("Caller {caller} is not allowed to delete charity {id}")]
    NotAllowedToDelete { id: u64, caller: Identity },

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Registry not initialized at {}", path.display())]
    NotInitialized { path: PathBuf },

    #[error("Registry already initialized at {}", path.display())]
    AlreadyInitialized { path: PathBuf },

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Incompatible state format: found {found}, supported {supported}")]
    IncompatibleFormat { found: String, supported: String },

    #[error("Corrupt registry state: {0}")]
    CorruptState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
