//! Verification error types.

use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Result type for token verification.
pub type AuthResult<T> = Result<T, VerificationError>;

/// The single, opaque failure returned for any rejected token.
///
/// Callers learn nothing about why a token was refused; the cause is only
/// logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("token verification failed")]
pub struct VerificationError;

/// Internal causes, collapsed into [`VerificationError`] at the boundary.
#[derive(Debug, Error)]
pub(crate) enum VerifyFailure {
    #[error("malformed token header: {0}")]
    Header(#[source] jsonwebtoken::errors::Error),

    #[error("algorithm {0:?} is not accepted")]
    Algorithm(Algorithm),

    #[error("no signing key matches kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("key set fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("unusable key: {0}")]
    Key(#[source] jsonwebtoken::errors::Error),

    #[error("token rejected: {0}")]
    Token(#[source] jsonwebtoken::errors::Error),

    #[error("token carries neither email nor sub")]
    NoSubject,
}
