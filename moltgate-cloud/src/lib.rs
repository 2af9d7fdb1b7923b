//! Credential-scoped R2 sync engine for moltgate.
//!
//! Persists the gateway's mutable state to object storage with:
//! - Fresh rclone credential bundles per transfer (no cached credentials)
//! - Guaranteed removal of credential files on every exit path
//! - Fatal vs recoverable classification per data set
//! - A retried connectivity probe with masked diagnostics

pub mod bundle;
pub mod config;
pub mod error;
pub mod sync_engine;
pub mod transfer;
pub mod types;

pub use bundle::{CredentialBundle, is_valid_bucket_name};
pub use config::{StorageSecrets, SyncConfig, ensure_configured};
pub use error::{CloudResult, SyncError};
pub use sync_engine::SyncEngine;
pub use types::*;
