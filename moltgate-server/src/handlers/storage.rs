//! Persistence endpoints.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moltgate_cloud::{StorageStatus, SyncError, ensure_configured};
use serde_json::json;

/// GET /storage
pub async fn status(State(state): State<AppState>) -> Json<StorageStatus> {
    Json(state.sync.status(&state.storage).await)
}

/// GET /storage/test
pub async fn test(State(state): State<AppState>) -> Response {
    match state.sync.test_connectivity(&state.storage).await {
        Ok(report) => Json(report).into_response(),
        Err(SyncError::NotConfigured { missing }) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "error": "R2 storage is not configured",
                "missing": missing,
            })),
        )
            .into_response(),
        Err(e @ SyncError::InvalidBucket(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("storage probe failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// POST /storage/sync
pub async fn sync(State(state): State<AppState>) -> Response {
    let configured = ensure_configured(&state.storage);
    let result = state.sync.sync_all(&state.storage).await;

    if result.success {
        return Json(json!({
            "success": true,
            "message": "Sync completed successfully",
            "lastSync": result.last_sync,
        }))
        .into_response();
    }

    let status = if configured {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    };
    (
        status,
        Json(json!({
            "success": false,
            "error": result.error,
            "details": result.details,
        })),
    )
        .into_response()
}
