//! Shared types for sync operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of one transfer-tool invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

impl TransferOutput {
    /// Last `max_chars` characters of stderr, or of stdout when stderr is
    /// empty.
    pub fn error_tail(&self, max_chars: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        tail_chars(source, max_chars)
    }
}

/// Returns the last `max_chars` characters of `s` on a char boundary.
pub fn tail_chars(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    s.chars().skip(count - max_chars).collect()
}

/// Outcome of a full sync.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SyncResult {
    pub fn succeeded(last_sync: DateTime<Utc>) -> Self {
        Self {
            success: true,
            last_sync: Some(last_sync),
            error: None,
            details: None,
        }
    }

    pub fn failed(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            last_sync: None,
            error: Some(error.into()),
            details,
        }
    }
}

/// Persistence status reported to administrators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub missing: Vec<String>,
    pub last_sync: Option<DateTime<Utc>>,
    pub message: String,
}

/// Non-secret hints about the configured credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDiagnostics {
    pub account_id_preview: String,
    pub access_key_preview: String,
    pub endpoint: String,
    pub attempts: u32,
}

/// Result of the storage connectivity probe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub ok: bool,
    pub bucket: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub diagnostics: ProbeDiagnostics,
}

/// Shows only the first and last four characters of `value`.
pub fn mask_preview(value: &str) -> String {
    let value = value.trim();
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len().max(3));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
