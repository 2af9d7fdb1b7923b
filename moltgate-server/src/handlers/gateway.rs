//! Gateway lifecycle and version endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moltgate_cloud::{ensure_configured, tail_chars};
use moltgate_sandbox::{ReleaseVersion, SandboxError};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

/// POST /gateway/restart
pub async fn restart(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let outcome = state.gateway.restart().await?;
    let mut body = json!({ "success": true, "message": outcome.message });
    if let Some(previous) = outcome.previous_process_id {
        body["previousProcessId"] = Value::String(previous);
    }
    Ok(Json(body))
}

/// Numeric components of an `x.y.z` version.
fn components(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|part| part.parse().ok())
        .collect::<Option<Vec<u64>>>()
}

/// True when `latest` is strictly newer than `current`.
pub fn update_available(current: Option<&str>, latest: Option<&str>) -> bool {
    match (current.and_then(components), latest.and_then(components)) {
        (Some(current), Some(latest)) => latest > current,
        _ => false,
    }
}

/// GET /openclaw/version
pub async fn version(State(state): State<AppState>) -> Response {
    let lookup = async {
        let current = state.gateway.current_version().await?;
        let latest = state.gateway.latest_version().await?;
        Ok::<_, SandboxError>((current, latest))
    };

    match lookup.await {
        Ok((current, latest)) => Json(json!({
            "updateAvailable": update_available(current.as_deref(), latest.as_deref()),
            "current": current,
            "latest": latest,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("version lookup failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string(), "current": null, "latest": null })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub version: String,
}

/// POST /openclaw/update
///
/// Installs the release, pins it in the config directory, persists the pin
/// when storage is configured, then restarts the gateway.
pub async fn update(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> ApiResult<Json<Value>> {
    let version: ReleaseVersion = request
        .version
        .parse()
        .map_err(|e: SandboxError| ApiError::BadRequest(e.to_string()))?;

    let output = state.gateway.install_version(&version).await?;
    if !output.succeeded() {
        let reason = if output.stderr.trim().is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        return Err(ApiError::Internal(format!(
            "Install of {version} failed: {}",
            tail_chars(reason.trim(), 500)
        )));
    }

    state.gateway.write_version_override(&version).await?;

    let mut warning = None;
    let sync_persisted = if ensure_configured(&state.storage) {
        let result = state.sync.sync_all(&state.storage).await;
        if !result.success {
            let reason = result.error.unwrap_or_else(|| "unknown error".to_string());
            warn!("update to {version} installed but not persisted: {reason}");
            warning = Some(format!(
                "Version pin was not persisted ({reason}); it will be lost on container restart"
            ));
        }
        result.success
    } else {
        warning = Some(
            "R2 storage is not configured; the version pin will be lost on container restart"
                .to_string(),
        );
        false
    };

    state.gateway.restart().await?;
    info!("updated gateway to {version}, persisted={sync_persisted}");

    let mut body = json!({
        "success": true,
        "message": format!("Updated to {version}, gateway restarting"),
        "syncPersisted": sync_persisted,
    });
    if let Some(warning) = warning {
        body["warning"] = Value::String(warning);
    }
    Ok(Json(body))
}
