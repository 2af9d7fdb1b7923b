//! Credential-scoped transfer-tool invocation.
//!
//! Each call writes a fresh credential file, runs one command against it,
//! and removes it again. Nothing is reused between calls.

use crate::bundle::CredentialBundle;
use crate::config::{StorageSecrets, SyncConfig};
use crate::error::CloudResult;
use crate::types::TransferOutput;
use moltgate_sandbox::{ExecRequest, SandboxClient, SandboxResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Placeholder substituted with the credential file path.
pub const CONFIG_PLACEHOLDER: &str = "{config}";

/// A credential file that exists for the lifetime of one operation.
///
/// Call [`ScopedCredentialFile::release`] on every path. If the owning
/// future is dropped first, `Drop` schedules the removal on the runtime.
pub struct ScopedCredentialFile {
    sandbox: Arc<dyn SandboxClient>,
    path: String,
    released: bool,
}

impl ScopedCredentialFile {
    /// Writes `bundle` to a new private path under `scratch_dir`.
    pub async fn create(
        sandbox: Arc<dyn SandboxClient>,
        scratch_dir: &str,
        remote_name: &str,
        bundle: &CredentialBundle,
    ) -> SandboxResult<Self> {
        let path = format!(
            "{}/.rclone-{}.conf",
            scratch_dir.trim_end_matches('/'),
            Uuid::new_v4()
        );

        let mut rendered = bundle.render(remote_name);
        let written = sandbox.write_file(&path, rendered.as_bytes()).await;
        zeroize::Zeroize::zeroize(&mut rendered);

        let file = Self {
            sandbox,
            path,
            released: false,
        };
        match written {
            Ok(()) => Ok(file),
            // A partial write may have left a file behind.
            Err(e) => {
                file.release().await;
                Err(e)
            }
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Removes the file. Removal failures are logged, never raised, so they
    /// cannot mask the operation's own result.
    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = self.sandbox.remove_file(&self.path).await {
            warn!("failed to remove credential file {}: {e}", self.path);
        }
    }
}

impl Drop for ScopedCredentialFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("credential file {} dropped without release, removing", self.path);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let sandbox = self.sandbox.clone();
        let path = std::mem::take(&mut self.path);
        runtime.spawn(async move {
            if let Err(e) = sandbox.remove_file(&path).await {
                warn!("deferred removal of credential file {path} failed: {e}");
            }
        });
    }
}

/// Runs `command_template` with `{config}` bound to a freshly written
/// credential file, removing the file afterwards on every path.
pub async fn run_scoped(
    sandbox: &Arc<dyn SandboxClient>,
    secrets: &StorageSecrets,
    config: &SyncConfig,
    command_template: &str,
    timeout: Duration,
) -> CloudResult<TransferOutput> {
    let bundle = CredentialBundle::build(secrets)?;
    let file = ScopedCredentialFile::create(
        sandbox.clone(),
        &config.scratch_dir,
        &config.remote_name,
        &bundle,
    )
    .await?;

    let command = command_template.replace(CONFIG_PLACEHOLDER, file.path());
    debug!("running scoped transfer command: {command}");

    let result = sandbox.exec(ExecRequest::new(command, timeout)).await;
    file.release().await;

    let output = result?;
    Ok(TransferOutput {
        success: output.succeeded(),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
