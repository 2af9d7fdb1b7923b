//! Sandbox client backed by the local host.
//!
//! Used when moltgate runs inside the same container as the gateway.
//! Commands are executed through `sh -c` with piped output and a hard timeout.
//! Background processes get their own process group so a kill reaches
//! everything the start script spawned.

use crate::client::SandboxClient;
use crate::error::{SandboxError, SandboxResult};
use crate::types::{ExecOutput, ExecRequest, ProcessInfo, ProcessStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Poll interval for port readiness checks.
const PORT_POLL_INTERVAL: Duration = Duration::from_millis(250);

struct ManagedProcess {
    command: String,
    child: Child,
    killed: bool,
}

/// Executes sandbox primitives on the local host.
pub struct LocalSandbox {
    shell: String,
    processes: Mutex<HashMap<String, ManagedProcess>>,
    next_id: AtomicU64,
}

impl Default for LocalSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSandbox {
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            processes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn shell_command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command).stdin(Stdio::null());
        cmd
    }

    fn lock_processes(
        &self,
    ) -> SandboxResult<std::sync::MutexGuard<'_, HashMap<String, ManagedProcess>>> {
        self.processes.lock().map_err(|e| SandboxError::Io {
            path: "<process table>".to_string(),
            reason: e.to_string(),
        })
    }
}

fn status_of(process: &mut ManagedProcess) -> ProcessStatus {
    if process.killed {
        return ProcessStatus::Killed;
    }
    match process.child.try_wait() {
        Ok(None) => ProcessStatus::Running,
        Ok(Some(status)) if status.success() => ProcessStatus::Completed,
        Ok(Some(_)) | Err(_) => ProcessStatus::Failed,
    }
}

/// True while the child has not exited. Reaps it otherwise.
fn still_running(process: &mut ManagedProcess) -> bool {
    matches!(process.child.try_wait(), Ok(None))
}

/// Sends SIGKILL to the process group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
    // SAFETY: kill(2) touches no memory; `pgid` is a positive id of a group
    // created at spawn, so the negated value names exactly that group.
    let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if ret == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[async_trait]
impl SandboxClient for LocalSandbox {
    async fn exec(&self, request: ExecRequest) -> SandboxResult<ExecOutput> {
        debug!("exec: {}", request.command);

        let mut cmd = self.shell_command(&request.command);
        cmd.envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| SandboxError::Spawn {
            command: request.command.clone(),
            reason: e.to_string(),
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(request.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ExecOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            }),
            Ok(Err(e)) => Err(SandboxError::Spawn {
                command: request.command,
                reason: format!("failed to wait for command: {e}"),
            }),
            Err(_) => {
                warn!("command timed out after {:?}: {}", request.timeout, request.command);
                Err(SandboxError::TimedOut {
                    command: request.command,
                    after: request.timeout,
                })
            }
        }
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> SandboxResult<()> {
        let io_err = |e: std::io::Error| SandboxError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        };

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await.map_err(io_err)?;
        file.write_all(contents).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        // `mode` only applies on creation; tighten files that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(io_err)?;
        }
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> SandboxResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SandboxError::Io {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn list_processes(&self) -> SandboxResult<Vec<ProcessInfo>> {
        let mut table = self.lock_processes()?;
        let mut infos: Vec<ProcessInfo> = table
            .iter_mut()
            .map(|(id, process)| ProcessInfo {
                id: id.clone(),
                command: process.command.clone(),
                status: status_of(process),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(infos)
    }

    async fn start_process(
        &self,
        command: &str,
        env: &[(String, String)],
    ) -> SandboxResult<ProcessInfo> {
        let mut cmd = self.shell_command(command);
        cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| SandboxError::Spawn {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

        let id = format!("proc-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        info!("started background process {id}: {command}");

        let mut table = self.lock_processes()?;
        let before = table.len();
        table.retain(|_, process| still_running(process));
        if table.len() < before {
            debug!("pruned {} finished process(es)", before - table.len());
        }
        table.insert(
            id.clone(),
            ManagedProcess {
                command: command.to_string(),
                child,
                killed: false,
            },
        );

        Ok(ProcessInfo {
            id,
            command: command.to_string(),
            status: ProcessStatus::Starting,
        })
    }

    async fn kill_process(&self, id: &str) -> SandboxResult<()> {
        let mut table = self.lock_processes()?;
        let process = table
            .get_mut(id)
            .ok_or_else(|| SandboxError::ProcessNotFound(id.to_string()))?;

        let result = match process.child.id() {
            // Already reaped.
            None => Ok(()),
            #[cfg(unix)]
            Some(pid) => kill_group(pid),
            #[cfg(not(unix))]
            Some(_) => process.child.start_kill(),
        };
        result.map_err(|e| SandboxError::Io {
            path: format!("process {id}"),
            reason: e.to_string(),
        })?;
        process.killed = true;
        info!("killed background process {id}");
        Ok(())
    }

    async fn wait_for_port(&self, port: u16, timeout: Duration) -> SandboxResult<()> {
        let poll = async {
            loop {
                if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                    return;
                }
                tokio::time::sleep(PORT_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| SandboxError::PortNotReady { port, after: timeout })
    }
}
