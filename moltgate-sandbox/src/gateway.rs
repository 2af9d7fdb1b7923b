//! Gateway process lifecycle and CLI access.
//!
//! The gateway is the long-running assistant process inside the sandbox. It
//! owns the device registry, so every pairing call goes through its CLI, and
//! it is the process restarted or upgraded by administrative requests.

use crate::client::SandboxClient;
use crate::error::{SandboxError, SandboxResult};
use crate::types::{ExecOutput, ExecRequest, ProcessInfo};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for `openclaw --version`.
const VERSION_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for the npm registry lookup.
const LATEST_VERSION_TIMEOUT: Duration = Duration::from_secs(20);
/// Timeout for `npm install -g`.
const INSTALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable carrying the gateway token into CLI calls.
pub const GATEWAY_TOKEN_ENV: &str = "OPENCLAW_GATEWAY_TOKEN";

/// CLI subcommands that never denote the gateway itself.
const CLI_SUBCOMMANDS: &[&str] = &["devices", "--version", "onboard"];

/// Static description of the gateway inside the sandbox.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port the gateway listens on for its websocket protocol.
    pub port: u16,

    /// Command that starts the gateway in the foreground.
    pub start_command: String,

    /// Name of the gateway CLI binary.
    pub cli: String,

    /// npm package the CLI is installed from.
    pub package: String,

    /// Substrings that identify the gateway among background processes.
    pub process_markers: Vec<String>,

    /// Shared token passed to the CLI with `--token`, if the gateway uses one.
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Where a pinned version is recorded so the next sync persists it.
    pub version_override_path: String,

    /// How long `ensure_running` waits for the port after a cold start.
    pub startup_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 18789,
            start_command: "/usr/local/bin/start-openclaw.sh".to_string(),
            cli: "openclaw".to_string(),
            package: "openclaw".to_string(),
            process_markers: vec![
                "start-openclaw.sh".to_string(),
                "openclaw gateway".to_string(),
            ],
            token: None,
            version_override_path: "/root/.openclaw/version-override".to_string(),
            startup_timeout_secs: 180,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("start_command", &self.start_command)
            .field("cli", &self.cli)
            .field("package", &self.package)
            .field("process_markers", &self.process_markers)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("version_override_path", &self.version_override_path)
            .field("startup_timeout_secs", &self.startup_timeout_secs)
            .finish()
    }
}

/// Result of a restart request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_process_id: Option<String>,
}

/// A release version of exactly three numeric components (`2026.2.12`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn release_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("static pattern is valid"))
}

impl FromStr for ReleaseVersion {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if release_version_pattern().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(SandboxError::InvalidArgument(format!(
                "invalid version format: {s:?} (expected e.g. 2026.2.12)"
            )))
        }
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the first `x.y.z` version from CLI output such as
/// `openclaw 2026.2.12 (abc123)`.
pub fn parse_version_output(output: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+").expect("static pattern is valid"));
    pattern.find(output).map(|m| m.as_str().to_string())
}

/// Supervises the gateway process through a [`SandboxClient`].
pub struct GatewaySupervisor {
    sandbox: Arc<dyn SandboxClient>,
    config: GatewayConfig,
}

impl GatewaySupervisor {
    pub fn new(sandbox: Arc<dyn SandboxClient>, config: GatewayConfig) -> Self {
        Self { sandbox, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn sandbox(&self) -> &Arc<dyn SandboxClient> {
        &self.sandbox
    }

    fn is_gateway_command(&self, command: &str) -> bool {
        // Short-lived CLI calls share the binary name with the gateway.
        let is_cli_call = CLI_SUBCOMMANDS
            .iter()
            .any(|sub| command.contains(&format!("{} {sub}", self.config.cli)));
        !is_cli_call
            && self
                .config
                .process_markers
                .iter()
                .any(|marker| command.contains(marker.as_str()))
    }

    /// Finds the live gateway process, if any.
    pub async fn find_process(&self) -> SandboxResult<Option<ProcessInfo>> {
        let processes = self.sandbox.list_processes().await?;
        Ok(processes
            .into_iter()
            .find(|p| p.status.is_alive() && self.is_gateway_command(&p.command)))
    }

    /// Returns the running gateway, starting it and waiting for its port if
    /// nothing is running.
    pub async fn ensure_running(&self) -> SandboxResult<ProcessInfo> {
        if let Some(existing) = self.find_process().await? {
            debug!("gateway already running as {}", existing.id);
            return Ok(existing);
        }

        info!("gateway not running, starting {}", self.config.start_command);
        let process = self
            .sandbox
            .start_process(&self.config.start_command, &[])
            .await?;

        let timeout = Duration::from_secs(self.config.startup_timeout_secs);
        if let Err(e) = self.sandbox.wait_for_port(self.config.port, timeout).await {
            warn!("gateway {} did not open port {}: {e}", process.id, self.config.port);
            return Err(e);
        }

        info!("gateway {} is ready on port {}", process.id, self.config.port);
        Ok(process)
    }

    /// Kills the current gateway (if any) and starts a fresh instance
    /// without waiting for it to become ready.
    pub async fn restart(&self) -> SandboxResult<RestartOutcome> {
        let existing = self.find_process().await?;

        if let Some(ref process) = existing {
            info!("killing gateway process {}", process.id);
            if let Err(e) = self.sandbox.kill_process(&process.id).await {
                warn!("failed to kill gateway process {}: {e}", process.id);
            }
        }

        let started = self
            .sandbox
            .start_process(&self.config.start_command, &[])
            .await?;
        debug!("started replacement gateway {}", started.id);

        let message = if existing.is_some() {
            "Gateway process killed, new instance starting..."
        } else {
            "No existing process found, starting new instance..."
        };

        Ok(RestartOutcome {
            message: message.to_string(),
            previous_process_id: existing.map(|p| p.id),
        })
    }

    /// Builds a CLI command line addressed at the local gateway.
    ///
    /// The token is referenced as `$OPENCLAW_GATEWAY_TOKEN`, never inlined,
    /// so command lines are safe to log and to echo in errors.
    pub fn cli_command(&self, args: &str) -> String {
        let mut command = format!(
            "{} {args} --url ws://localhost:{}",
            self.config.cli, self.config.port
        );
        if self.config.token.is_some() {
            command.push_str(&format!(" --token \"${GATEWAY_TOKEN_ENV}\""));
        }
        command
    }

    /// Runs a gateway CLI subcommand.
    pub async fn cli(&self, args: &str, timeout: Duration) -> SandboxResult<ExecOutput> {
        let mut request = ExecRequest::new(self.cli_command(args), timeout);
        if let Some(ref token) = self.config.token {
            request = request.with_env(GATEWAY_TOKEN_ENV, token.as_str());
        }
        self.sandbox.exec(request).await
    }

    /// Version reported by the installed CLI.
    pub async fn current_version(&self) -> SandboxResult<Option<String>> {
        let output = self
            .sandbox
            .exec(ExecRequest::new(
                format!("{} --version", self.config.cli),
                VERSION_TIMEOUT,
            ))
            .await?;
        Ok(parse_version_output(&output.stdout))
    }

    /// Latest version published to the npm registry.
    pub async fn latest_version(&self) -> SandboxResult<Option<String>> {
        let output = self
            .sandbox
            .exec(ExecRequest::new(
                format!("npm view {} version", self.config.package),
                LATEST_VERSION_TIMEOUT,
            ))
            .await?;
        if !output.succeeded() {
            warn!("npm view failed: {}", output.stderr.trim());
            return Ok(None);
        }
        Ok(parse_version_output(&output.stdout))
    }

    /// Installs the given release globally.
    pub async fn install_version(&self, version: &ReleaseVersion) -> SandboxResult<ExecOutput> {
        info!("installing {}@{version}", self.config.package);
        self.sandbox
            .exec(ExecRequest::new(
                format!("npm install -g {}@{version}", self.config.package),
                INSTALL_TIMEOUT,
            ))
            .await
    }

    /// Records the pinned version inside the config directory.
    pub async fn write_version_override(&self, version: &ReleaseVersion) -> SandboxResult<()> {
        self.sandbox
            .write_file(
                &self.config.version_override_path,
                format!("{version}\n").as_bytes(),
            )
            .await
    }
}
