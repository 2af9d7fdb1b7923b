//! Pairing error types.

use moltgate_sandbox::SandboxError;
use thiserror::Error;

pub type PairingResult<T> = Result<T, PairingError>;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("invalid request id: {0:?}")]
    InvalidRequestId(String),

    /// The CLI answered with something that is not a device list.
    #[error("unparsable device list: {reason}")]
    Protocol {
        raw: String,
        stderr: String,
        reason: String,
    },

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
}

impl PairingError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequestId(_) => 400,
            _ => 500,
        }
    }
}
