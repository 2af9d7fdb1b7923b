//! Pairing orchestration over the gateway CLI.

use crate::error::{PairingError, PairingResult};
use crate::types::*;
use moltgate_sandbox::{ExecOutput, GatewaySupervisor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for each `devices` CLI call.
const CLI_TIMEOUT: Duration = Duration::from_secs(20);

const MAX_REQUEST_ID_LEN: usize = 128;

/// Checks that a request id is safe to place on a command line.
pub fn validate_request_id(request_id: &str) -> PairingResult<&str> {
    let valid = !request_id.is_empty()
        && request_id.len() <= MAX_REQUEST_ID_LEN
        && request_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(request_id)
    } else {
        Err(PairingError::InvalidRequestId(request_id.to_string()))
    }
}

/// The outermost `{ ... }` span of `output`, tolerating log lines around it.
pub fn extract_json_object(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (end > start).then(|| &output[start..=end])
}

/// Interprets the output of `devices list --json`.
pub fn parse_listing(output: &ExecOutput) -> DeviceListing {
    let unparsable = |parse_error: Option<String>| DeviceListing::Unparsable {
        raw: output.stdout.clone(),
        stderr: output.stderr.clone(),
        parse_error,
    };

    let Some(json) = extract_json_object(&output.stdout) else {
        return unparsable(None);
    };
    match serde_json::from_str::<DeviceList>(json) {
        Ok(list) => DeviceListing::Parsed(list),
        Err(e) => unparsable(Some(e.to_string())),
    }
}

/// Lists and approves device pairing requests.
pub struct PairingOrchestrator {
    gateway: Arc<GatewaySupervisor>,
}

impl PairingOrchestrator {
    pub fn new(gateway: Arc<GatewaySupervisor>) -> Self {
        Self { gateway }
    }

    /// Lists pending and paired devices, starting the gateway if needed.
    pub async fn list(&self) -> PairingResult<DeviceListing> {
        self.gateway.ensure_running().await?;
        let output = self.gateway.cli("devices list --json", CLI_TIMEOUT).await?;
        let listing = parse_listing(&output);
        if let DeviceListing::Unparsable { ref parse_error, .. } = listing {
            warn!("device list output was not parseable: {parse_error:?}");
        }
        Ok(listing)
    }

    /// Approves one pending request.
    pub async fn approve(&self, request_id: &str) -> PairingResult<ApprovalOutcome> {
        let request_id = validate_request_id(request_id)?;
        self.gateway.ensure_running().await?;
        self.approve_unchecked(request_id).await
    }

    async fn approve_unchecked(&self, request_id: &str) -> PairingResult<ApprovalOutcome> {
        let output = self
            .gateway
            .cli(&format!("devices approve {request_id}"), CLI_TIMEOUT)
            .await?;

        // Either signal is enough; CLI wording has changed across releases.
        let success =
            output.stdout.to_lowercase().contains("approved") || output.exit_code == Some(0);
        let error = (!success).then(|| {
            let stderr = output.stderr.trim();
            if stderr.is_empty() {
                "Approval failed".to_string()
            } else {
                stderr.to_string()
            }
        });

        debug!("approve {request_id}: success={success}");
        Ok(ApprovalOutcome {
            request_id: request_id.to_string(),
            success,
            error,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Approves every pending request, one at a time.
    ///
    /// Per-device failures, timeouts included, are collected in `failed`.
    pub async fn approve_all(&self) -> PairingResult<BatchApproval> {
        let pending = match self.list().await? {
            DeviceListing::Parsed(list) => list.pending,
            DeviceListing::Unparsable {
                raw,
                stderr,
                parse_error,
            } => {
                return Err(PairingError::Protocol {
                    raw,
                    stderr,
                    reason: parse_error
                        .unwrap_or_else(|| "no JSON object in CLI output".to_string()),
                });
            }
        };

        if pending.is_empty() {
            return Ok(BatchApproval {
                message: "No pending devices to approve".to_string(),
                ..BatchApproval::default()
            });
        }

        let total = pending.len();
        let mut batch = BatchApproval::default();
        for request in pending {
            let id = request.request_id;
            let outcome = match validate_request_id(&id) {
                Ok(_) => self.approve_unchecked(&id).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(outcome) if outcome.success => batch.approved.push(outcome.request_id),
                Ok(outcome) => {
                    warn!("approval of {id} failed: {:?}", outcome.error);
                    batch.failed.push(outcome);
                }
                Err(e) => {
                    warn!("approval of {id} failed: {e}");
                    batch.failed.push(ApprovalOutcome::failed(id, e.to_string()));
                }
            }
        }

        batch.message = format!("Approved {} of {total} pending device(s)", batch.approved.len());
        info!("{}", batch.message);
        Ok(batch)
    }
}
