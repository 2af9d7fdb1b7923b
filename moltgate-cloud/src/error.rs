//! Sync error types.

use moltgate_sandbox::SandboxError;
use thiserror::Error;

/// Result type for sync operations.
pub type CloudResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing to object storage.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("R2 storage is not configured (missing: {})", .missing.join(", "))]
    NotConfigured { missing: Vec<String> },

    #[error("invalid R2 bucket name {0:?}")]
    InvalidBucket(String),

    #[error("Sync aborted: no config file found")]
    NoConfigFound,

    #[error("{message}")]
    Transfer { message: String, details: String },

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
}

impl SyncError {
    pub(crate) fn not_configured(missing: Vec<&'static str>) -> Self {
        Self::NotConfigured {
            missing: missing.into_iter().map(String::from).collect(),
        }
    }

    /// HTTP-style status class: 400 for configuration gaps, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotConfigured { .. } | Self::InvalidBucket(_) => 400,
            _ => 500,
        }
    }
}
