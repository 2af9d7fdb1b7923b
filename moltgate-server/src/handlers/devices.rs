//! Device pairing endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::{Extension, Json};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use moltgate_auth::Identity;
use moltgate_pairing::{BatchApproval, DeviceListing};
use serde_json::{Value, json};
use tracing::info;

/// GET /devices
pub async fn list(State(state): State<AppState>) -> ApiResult<Response> {
    let response = match state.pairing.list().await? {
        DeviceListing::Parsed(list) => Json(list).into_response(),
        DeviceListing::Unparsable {
            raw,
            stderr,
            parse_error,
        } => {
            let mut body = json!({
                "pending": [],
                "paired": [],
                "raw": raw,
                "stderr": stderr,
            });
            if let Some(parse_error) = parse_error {
                body["parseError"] = Value::String(parse_error);
            }
            Json(body).into_response()
        }
    };
    Ok(response)
}

/// POST /devices/{requestId}/approve
pub async fn approve(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let outcome = state.pairing.approve(&request_id).await?;

    if let Some(Extension(identity)) = identity {
        info!(
            "device request {} approval by {}: success={}",
            outcome.request_id, identity.email, outcome.success
        );
    }

    let message = match outcome.error {
        None => "Device approved".to_string(),
        Some(ref error) => error.clone(),
    };
    Ok(Json(json!({
        "success": outcome.success,
        "requestId": outcome.request_id,
        "message": message,
        "stdout": outcome.stdout,
        "stderr": outcome.stderr,
    })))
}

/// POST /devices/approve-all
pub async fn approve_all(State(state): State<AppState>) -> ApiResult<Json<BatchApproval>> {
    Ok(Json(state.pairing.approve_all().await?))
}
