//! Shared helpers for sync engine tests.

#![allow(dead_code)]

use moltgate_cloud::{StorageSecrets, SyncConfig, SyncEngine};
use moltgate_sandbox::mock::ScriptedSandbox;
use std::sync::Arc;

/// Secrets with all three required values set.
pub fn full_secrets() -> StorageSecrets {
    StorageSecrets {
        access_key_id: Some("AKIAEXAMPLEKEY123".into()),
        secret_access_key: Some("super-secret-value".into()),
        account_id: Some("0123456789abcdef".into()),
        bucket_override: None,
    }
}

/// Sync config with no retry delay so probe tests run instantly.
pub fn fast_config() -> SyncConfig {
    SyncConfig {
        probe_retry_delay_ms: 0,
        ..SyncConfig::default()
    }
}

pub fn engine(sandbox: &Arc<ScriptedSandbox>) -> SyncEngine {
    SyncEngine::new(sandbox.clone(), fast_config())
}

/// True for paths that look like per-call credential files.
pub fn is_credential_file(path: &str) -> bool {
    path.starts_with("/tmp/.rclone-") && path.ends_with(".conf")
}
