//! Administrative route handlers.

pub mod devices;
pub mod gateway;
pub mod storage;

use axum::Json;
use serde_json::{Value, json};

/// Liveness probe; not behind the access middleware.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
