//! Sandbox error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors raised by the sandbox collaborator.
///
/// Messages carry the command line as issued. Callers must never put secret
/// values on a command line; credentials travel through scratch files.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to spawn `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` timed out after {}ms", .after.as_millis())]
    TimedOut { command: String, after: Duration },

    #[error("sandbox I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("process not found: {0}")]
    ProcessNotFound(String),

    #[error("port {port} not ready after {}ms", .after.as_millis())]
    PortNotReady { port: u16, after: Duration },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SandboxError {
    /// Returns true when the failure was a timeout rather than a hard error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. } | Self::PortNotReady { .. })
    }
}
