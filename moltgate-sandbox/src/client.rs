//! The collaborator seam between moltgate and the sandbox.

use crate::error::SandboxResult;
use crate::types::{ExecOutput, ExecRequest, ProcessInfo};
use async_trait::async_trait;
use std::time::Duration;

/// Process and file primitives offered by the sandbox host.
///
/// Every call is a suspension point. `exec` is bounded by the request's
/// timeout; a timed-out call yields [`SandboxError::TimedOut`] and the
/// underlying process is terminated on a best-effort basis only.
///
/// [`SandboxError::TimedOut`]: crate::SandboxError::TimedOut
#[async_trait]
pub trait SandboxClient: Send + Sync {
    /// Runs a shell command and collects its output.
    async fn exec(&self, request: ExecRequest) -> SandboxResult<ExecOutput>;

    /// Creates or truncates `path` and writes `contents` readable by the
    /// owner only.
    async fn write_file(&self, path: &str, contents: &[u8]) -> SandboxResult<()>;

    /// Removes `path`. Removing a missing file is not an error.
    async fn remove_file(&self, path: &str) -> SandboxResult<()>;

    /// Lists background processes started in this sandbox.
    async fn list_processes(&self) -> SandboxResult<Vec<ProcessInfo>>;

    /// Starts `command` in the background and returns immediately.
    async fn start_process(&self, command: &str, env: &[(String, String)])
    -> SandboxResult<ProcessInfo>;

    /// Terminates a background process.
    async fn kill_process(&self, id: &str) -> SandboxResult<()>;

    /// Waits until something accepts TCP connections on `port`.
    async fn wait_for_port(&self, port: u16, timeout: Duration) -> SandboxResult<()>;
}
