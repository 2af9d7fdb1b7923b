//! Sync engine configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bucket used when no override is configured.
pub const DEFAULT_BUCKET: &str = "moltbot-data";

/// Environment names of the three required storage secrets, in report order.
pub const REQUIRED_SECRET_NAMES: [&str; 3] =
    ["R2_ACCESS_KEY_ID", "R2_SECRET_ACCESS_KEY", "CF_ACCOUNT_ID"];

/// Raw storage secrets as provided by the deployment.
///
/// Values are kept verbatim; trimming happens when a credential bundle is
/// built. Neither `Debug` nor `Serialize` emits the credential values.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct StorageSecrets {
    #[serde(skip_serializing)]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    #[serde(skip_serializing)]
    pub account_id: Option<String>,
    /// Overrides [`DEFAULT_BUCKET`].
    pub bucket_override: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl StorageSecrets {
    /// Names of required secrets that are absent or blank.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            &self.access_key_id,
            &self.secret_access_key,
            &self.account_id,
        ]
        .into_iter()
        .zip(REQUIRED_SECRET_NAMES)
        .filter(|(value, _)| !present(value))
        .map(|(_, name)| name)
        .collect()
    }

    /// Bucket name after applying the override.
    pub fn bucket(&self) -> &str {
        match self.bucket_override.as_deref().map(str::trim) {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ => DEFAULT_BUCKET,
        }
    }
}

impl fmt::Debug for StorageSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |v: &Option<String>| if present(v) { "<set>" } else { "<unset>" };
        f.debug_struct("StorageSecrets")
            .field("access_key_id", &mark(&self.access_key_id))
            .field("secret_access_key", &mark(&self.secret_access_key))
            .field("account_id", &mark(&self.account_id))
            .field("bucket", &self.bucket())
            .finish()
    }
}

/// True when all three required secrets are non-empty after trimming.
pub fn ensure_configured(secrets: &StorageSecrets) -> bool {
    secrets.missing().is_empty()
}

/// One supported layout of the gateway's configuration directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayout {
    /// Directory synced as the config data set.
    pub dir: String,
    /// File whose presence identifies this layout.
    pub marker_file: String,
}

impl ConfigLayout {
    pub fn new(dir: impl Into<String>, marker_file: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            marker_file: marker_file.into(),
        }
    }

    pub fn marker_path(&self) -> String {
        format!("{}/{}", self.dir.trim_end_matches('/'), self.marker_file)
    }
}

/// Configuration for the sync engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// rclone remote name used inside the credential bundle.
    pub remote_name: String,

    /// Transfer tool binary.
    pub rclone_binary: String,

    /// Candidate config layouts, current product name first.
    pub config_layouts: Vec<ConfigLayout>,

    /// Remote prefix for the config data set.
    pub config_prefix: String,

    /// Agent workspace directory (optional data set).
    pub workspace_dir: String,

    /// Skills directory (optional data set).
    pub skills_dir: String,

    /// Marker file holding the last successful sync time.
    pub last_sync_marker: String,

    /// Directory for per-call credential files.
    pub scratch_dir: String,

    /// Flags appended to every sync.
    pub transfer_flags: String,

    pub sync_timeout_secs: u64,

    pub probe_timeout_secs: u64,

    /// Delay before the single connectivity probe retry.
    pub probe_retry_delay_ms: u64,

    /// Characters of tool output kept in error details.
    pub error_tail_chars: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_name: "r2".to_string(),
            rclone_binary: "rclone".to_string(),
            config_layouts: vec![
                ConfigLayout::new("/root/.openclaw", "openclaw.json"),
                ConfigLayout::new("/root/.clawdbot", "clawdbot.json"),
            ],
            config_prefix: "openclaw".to_string(),
            workspace_dir: "/root/clawd".to_string(),
            skills_dir: "/root/clawd/skills".to_string(),
            last_sync_marker: "/tmp/.last-sync".to_string(),
            scratch_dir: "/tmp".to_string(),
            transfer_flags: "--transfers=16 --fast-list --s3-no-check-bucket".to_string(),
            sync_timeout_secs: 120,
            probe_timeout_secs: 15,
            probe_retry_delay_ms: 2_000,
            error_tail_chars: 500,
        }
    }
}

impl SyncConfig {
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn probe_retry_delay(&self) -> Duration {
        Duration::from_millis(self.probe_retry_delay_ms)
    }
}
