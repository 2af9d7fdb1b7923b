//! R2 sync orchestration.
//!
//! Coordinates the data sets that make up the gateway's persistent state:
//! - Config directory (fatal on failure, gates the last-sync marker)
//! - Agent workspace (best effort)
//! - Skills (best effort)
//!
//! Every transfer goes through [`run_scoped`], so each one authenticates
//! with credentials written moments before and removed right after.

use crate::bundle::CredentialBundle;
use crate::config::{ConfigLayout, StorageSecrets, SyncConfig};
use crate::error::{CloudResult, SyncError};
use crate::transfer::run_scoped;
use crate::types::*;
use chrono::{DateTime, SecondsFormat, Utc};
use moltgate_sandbox::{ExecRequest, SandboxClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timeout for cheap existence checks inside the sandbox.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const CONFIGURED_MESSAGE: &str =
    "R2 storage is configured. Your data will persist across container restarts.";
const UNCONFIGURED_MESSAGE: &str = "R2 storage is not configured. Paired devices and \
     conversations will be lost when the container restarts.";

/// Sync engine for the gateway's persistent state.
pub struct SyncEngine {
    sandbox: Arc<dyn SandboxClient>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(sandbox: Arc<dyn SandboxClient>, config: SyncConfig) -> Self {
        Self { sandbox, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs a transfer command with a freshly written credential bundle.
    pub async fn run_scoped(
        &self,
        secrets: &StorageSecrets,
        command_template: &str,
        timeout: Duration,
    ) -> CloudResult<TransferOutput> {
        run_scoped(&self.sandbox, secrets, &self.config, command_template, timeout).await
    }

    /// Builds an rclone command line that reads its config from the scoped
    /// credential file.
    fn rclone(&self, args: &str) -> String {
        format!("{} --config {{config}} {args}", self.config.rclone_binary)
    }

    async fn check(&self, command: String) -> bool {
        match self.sandbox.exec(ExecRequest::new(command, CHECK_TIMEOUT)).await {
            Ok(output) => output.succeeded(),
            Err(e) => {
                warn!("sandbox check failed: {e}");
                false
            }
        }
    }

    /// Finds the first config layout whose marker file exists.
    async fn detect_layout(&self) -> Option<&ConfigLayout> {
        for layout in &self.config.config_layouts {
            if self.check(format!("test -f {}", layout.marker_path())).await {
                debug!("detected config layout at {}", layout.dir);
                return Some(layout);
            }
        }
        None
    }

    /// Syncs all data sets and records the completion time.
    ///
    /// Never fails outright; every failure is described in the result.
    pub async fn sync_all(&self, secrets: &StorageSecrets) -> SyncResult {
        match self.try_sync_all(secrets).await {
            Ok(last_sync) => {
                info!("sync completed at {last_sync}");
                SyncResult::succeeded(last_sync)
            }
            Err(e) => {
                error!("sync failed: {e}");
                match e {
                    SyncError::NotConfigured { .. } => {
                        SyncResult::failed("R2 storage is not configured", None)
                    }
                    SyncError::InvalidBucket(bucket) => SyncResult::failed(
                        "R2 bucket name is invalid",
                        Some(format!("{bucket:?} is not a valid bucket name")),
                    ),
                    SyncError::NoConfigFound => SyncResult::failed(
                        SyncError::NoConfigFound.to_string(),
                        Some(
                            "Neither openclaw.json nor clawdbot.json found in config directory."
                                .to_string(),
                        ),
                    ),
                    SyncError::Transfer { message, details } => {
                        SyncResult::failed(message, Some(details))
                    }
                    SyncError::Sandbox(inner) => {
                        SyncResult::failed("Sync failed", Some(inner.to_string()))
                    }
                }
            }
        }
    }

    async fn try_sync_all(&self, secrets: &StorageSecrets) -> CloudResult<DateTime<Utc>> {
        let missing = secrets.missing();
        if !missing.is_empty() {
            return Err(SyncError::not_configured(missing));
        }

        let remote = CredentialBundle::build(secrets)?.remote_root(&self.config.remote_name);
        let layout = self.detect_layout().await.ok_or(SyncError::NoConfigFound)?;
        let flags = &self.config.transfer_flags;
        let timeout = self.config.sync_timeout();

        let config_sync = self.rclone(&format!(
            "sync {}/ {remote}{}/ {flags} --exclude='*.lock' --exclude='*.log' \
             --exclude='*.tmp' --exclude='.git/**'",
            layout.dir.trim_end_matches('/'),
            self.config.config_prefix
        ));
        let output = self.run_scoped(secrets, &config_sync, timeout).await?;
        if !output.success {
            return Err(SyncError::Transfer {
                message: "Config sync failed".to_string(),
                details: output.error_tail(self.config.error_tail_chars),
            });
        }

        let workspace = self.config.workspace_dir.trim_end_matches('/');
        if self.check(format!("test -d {workspace}")).await {
            let workspace_sync = self.rclone(&format!(
                "sync {workspace}/ {remote}workspace/ {flags} --exclude='skills/**' \
                 --exclude='.git/**' --exclude='node_modules/**'"
            ));
            self.sync_optional("workspace", secrets, &workspace_sync).await;
        }

        let skills = self.config.skills_dir.trim_end_matches('/');
        if self.check(format!("test -d {skills}")).await {
            let skills_sync = self.rclone(&format!("sync {skills}/ {remote}skills/ {flags}"));
            self.sync_optional("skills", secrets, &skills_sync).await;
        }

        self.write_marker().await
    }

    /// Syncs a non-essential data set; failures are logged and swallowed.
    async fn sync_optional(&self, label: &str, secrets: &StorageSecrets, command: &str) {
        match self
            .run_scoped(secrets, command, self.config.sync_timeout())
            .await
        {
            Ok(output) if output.success => debug!("{label} sync completed"),
            Ok(output) => warn!(
                "{label} sync failed (non-fatal): {}",
                output.error_tail(self.config.error_tail_chars)
            ),
            Err(e) => warn!("{label} sync failed (non-fatal): {e}"),
        }
    }

    async fn write_marker(&self) -> CloudResult<DateTime<Utc>> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.sandbox
            .write_file(&self.config.last_sync_marker, format!("{now}\n").as_bytes())
            .await?;

        self.read_marker().await.ok_or_else(|| SyncError::Transfer {
            message: "Sync completed but the timestamp marker could not be read back".to_string(),
            details: self.config.last_sync_marker.clone(),
        })
    }

    /// Reads the last successful sync time from the sandbox.
    pub async fn read_marker(&self) -> Option<DateTime<Utc>> {
        let output = self
            .sandbox
            .exec(ExecRequest::new(
                format!("cat {}", self.config.last_sync_marker),
                CHECK_TIMEOUT,
            ))
            .await
            .ok()?;
        if !output.succeeded() {
            return None;
        }
        DateTime::parse_from_rfc3339(output.stdout.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Reports whether persistence is configured and when it last ran.
    pub async fn status(&self, secrets: &StorageSecrets) -> StorageStatus {
        let missing: Vec<String> = secrets.missing().into_iter().map(String::from).collect();
        let configured = missing.is_empty();

        let last_sync = if configured {
            self.read_marker().await
        } else {
            None
        };

        StorageStatus {
            configured,
            missing,
            last_sync,
            message: if configured {
                CONFIGURED_MESSAGE
            } else {
                UNCONFIGURED_MESSAGE
            }
            .to_string(),
        }
    }

    /// Probes the bucket with a size query, retrying once after a fixed
    /// delay.
    ///
    /// A size query is used instead of a listing because empty buckets can
    /// answer listings with a misleading "not found".
    pub async fn test_connectivity(&self, secrets: &StorageSecrets) -> CloudResult<ProbeReport> {
        let bundle = CredentialBundle::build(secrets)?;
        let command = self.rclone(&format!(
            "size {}",
            bundle
                .remote_root(&self.config.remote_name)
                .trim_end_matches('/')
        ));

        let mut attempts = 0;
        let mut last = None;
        while attempts < 2 {
            if attempts > 0 {
                warn!("connectivity probe failed, retrying once");
                tokio::time::sleep(self.config.probe_retry_delay()).await;
            }
            attempts += 1;

            let outcome = self
                .run_scoped(secrets, &command, self.config.probe_timeout())
                .await;
            let done = matches!(outcome, Ok(ref output) if output.success);
            last = Some(outcome);
            if done {
                break;
            }
        }

        let output = match last {
            Some(Ok(output)) => output,
            Some(Err(SyncError::Sandbox(e))) => TransferOutput {
                stderr: e.to_string(),
                ..TransferOutput::default()
            },
            Some(Err(e)) => return Err(e),
            None => TransferOutput::default(),
        };

        Ok(ProbeReport {
            ok: output.success,
            bucket: bundle.bucket().to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            diagnostics: ProbeDiagnostics {
                account_id_preview: mask_preview(secrets.account_id.as_deref().unwrap_or("")),
                access_key_preview: mask_preview(bundle.access_key()),
                endpoint: mask_endpoint(bundle.endpoint(), secrets),
                attempts,
            },
        })
    }
}

fn mask_endpoint(endpoint: &str, secrets: &StorageSecrets) -> String {
    match secrets.account_id.as_deref().map(str::trim) {
        Some(account) if !account.is_empty() => endpoint.replace(account, &mask_preview(account)),
        _ => endpoint.to_string(),
    }
}
