//! Scripted in-memory sandbox for tests.
//!
//! Commands are matched by substring against registered rules. One-shot
//! replies are consumed before the rule's standing reply. Files live in a
//! map, and every exec records which files existed at that moment so tests
//! can assert credential lifetimes.

use crate::client::SandboxClient;
use crate::error::{SandboxError, SandboxResult};
use crate::types::{ExecOutput, ExecRequest, ProcessInfo, ProcessStatus};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Debug)]
enum Reply {
    Output(ExecOutput),
    Timeout,
}

struct Rule {
    pattern: String,
    queued: VecDeque<Reply>,
    standing: Option<Reply>,
}

/// One recorded `exec` call.
#[derive(Clone, Debug)]
pub struct ExecRecord {
    pub command: String,
    pub timeout: Duration,
    /// Per-call environment passed with the request.
    pub env: Vec<(String, String)>,
    /// Paths present in the scripted filesystem when the command ran.
    pub files_present: Vec<String>,
}

#[derive(Default)]
struct State {
    rules: Vec<Rule>,
    calls: Vec<ExecRecord>,
    files: BTreeMap<String, Vec<u8>>,
    written: Vec<String>,
    removed: Vec<String>,
    processes: Vec<ProcessInfo>,
    next_process: u64,
    port_ready: bool,
}

/// A [`SandboxClient`] whose behaviour is scripted by the test.
pub struct ScriptedSandbox {
    state: Mutex<State>,
}

impl Default for ScriptedSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSandbox {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                port_ready: true,
                next_process: 1,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn rule_mut<'a>(state: &'a mut State, pattern: &str) -> &'a mut Rule {
        if let Some(idx) = state.rules.iter().position(|r| r.pattern == pattern) {
            return &mut state.rules[idx];
        }
        state.rules.push(Rule {
            pattern: pattern.to_string(),
            queued: VecDeque::new(),
            standing: None,
        });
        state.rules.last_mut().expect("rule was just pushed")
    }

    /// Every command containing `pattern` returns `output`.
    pub fn on(&self, pattern: &str, output: ExecOutput) -> &Self {
        let mut state = self.state();
        Self::rule_mut(&mut state, pattern).standing = Some(Reply::Output(output));
        self
    }

    /// The next command containing `pattern` returns `output`.
    pub fn on_once(&self, pattern: &str, output: ExecOutput) -> &Self {
        let mut state = self.state();
        Self::rule_mut(&mut state, pattern)
            .queued
            .push_back(Reply::Output(output));
        self
    }

    /// Every command containing `pattern` times out.
    pub fn on_timeout(&self, pattern: &str) -> &Self {
        let mut state = self.state();
        Self::rule_mut(&mut state, pattern).standing = Some(Reply::Timeout);
        self
    }

    /// Seeds a file.
    pub fn put_file(&self, path: &str, contents: &[u8]) -> &Self {
        self.state().files.insert(path.to_string(), contents.to_vec());
        self
    }

    /// Seeds a background process.
    pub fn with_process(&self, id: &str, command: &str, status: ProcessStatus) -> &Self {
        self.state().processes.push(ProcessInfo {
            id: id.to_string(),
            command: command.to_string(),
            status,
        });
        self
    }

    /// Makes `wait_for_port` fail.
    pub fn port_never_ready(&self) -> &Self {
        self.state().port_ready = false;
        self
    }

    pub fn calls(&self) -> Vec<ExecRecord> {
        self.state().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state().calls.iter().map(|c| c.command.clone()).collect()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.command.contains(pattern))
            .count()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    /// Paths passed to `write_file`, in order.
    pub fn written_paths(&self) -> Vec<String> {
        self.state().written.clone()
    }

    /// Paths passed to `remove_file`, in order.
    pub fn removed_paths(&self) -> Vec<String> {
        self.state().removed.clone()
    }

    pub fn processes(&self) -> Vec<ProcessInfo> {
        self.state().processes.clone()
    }
}

#[async_trait]
impl SandboxClient for ScriptedSandbox {
    async fn exec(&self, request: ExecRequest) -> SandboxResult<ExecOutput> {
        let mut state = self.state();
        let files_present = state.files.keys().cloned().collect();
        state.calls.push(ExecRecord {
            command: request.command.clone(),
            timeout: request.timeout,
            env: request.env.clone(),
            files_present,
        });

        let reply = state
            .rules
            .iter_mut()
            .find(|r| request.command.contains(r.pattern.as_str()))
            .and_then(|rule| rule.queued.pop_front().or_else(|| rule.standing.clone()));

        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Timeout) => Err(SandboxError::TimedOut {
                command: request.command,
                after: request.timeout,
            }),
            None => {
                // Unscripted `cat` reads the scripted filesystem.
                if let Some(path) = request.command.strip_prefix("cat ") {
                    if let Some(contents) = state.files.get(path.trim()) {
                        return Ok(ExecOutput::ok(String::from_utf8_lossy(contents)));
                    }
                }
                Ok(ExecOutput::failed(127, "command not scripted"))
            }
        }
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> SandboxResult<()> {
        let mut state = self.state();
        state.files.insert(path.to_string(), contents.to_vec());
        state.written.push(path.to_string());
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> SandboxResult<()> {
        let mut state = self.state();
        state.files.remove(path);
        state.removed.push(path.to_string());
        Ok(())
    }

    async fn list_processes(&self) -> SandboxResult<Vec<ProcessInfo>> {
        Ok(self.state().processes.clone())
    }

    async fn start_process(
        &self,
        command: &str,
        _env: &[(String, String)],
    ) -> SandboxResult<ProcessInfo> {
        let mut state = self.state();
        let info = ProcessInfo {
            id: format!("scripted-{}", state.next_process),
            command: command.to_string(),
            status: ProcessStatus::Running,
        };
        state.next_process += 1;
        state.processes.push(info.clone());
        Ok(info)
    }

    async fn kill_process(&self, id: &str) -> SandboxResult<()> {
        let mut state = self.state();
        let process = state
            .processes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| SandboxError::ProcessNotFound(id.to_string()))?;
        process.status = ProcessStatus::Killed;
        Ok(())
    }

    async fn wait_for_port(&self, port: u16, timeout: Duration) -> SandboxResult<()> {
        if self.state().port_ready {
            Ok(())
        } else {
            Err(SandboxError::PortNotReady { port, after: timeout })
        }
    }
}
