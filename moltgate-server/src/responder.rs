//! Turns access denials into HTTP responses.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use moltgate_auth::{Denial, DenyReason, ResponseShape};
use serde_json::{Map, Value};

/// Renders denials decided by the access gate.
pub trait Responder: Send + Sync {
    fn deny(&self, denial: &Denial) -> Response;
}

/// JSON bodies, `302` redirects, and plain-text pages for browsers.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultResponder;

fn status_of(reason: &DenyReason) -> StatusCode {
    StatusCode::from_u16(reason.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn body_of(reason: &DenyReason) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("error".into(), reason.message().into());
    if let DenyReason::Unauthorized { hint, details } = reason {
        if let Some(hint) = hint {
            body.insert("hint".into(), hint.clone().into());
        }
        if let Some(details) = details {
            body.insert("details".into(), details.clone().into());
        }
    }
    body
}

/// Message first, then hint and details on their own lines.
fn plain_text(reason: &DenyReason) -> String {
    let mut text = reason.message().to_string();
    if let DenyReason::Unauthorized { hint, details } = reason {
        for line in [hint, details].into_iter().flatten() {
            text.push('\n');
            text.push_str(line);
        }
    }
    text
}

impl Responder for DefaultResponder {
    fn deny(&self, denial: &Denial) -> Response {
        let status = status_of(&denial.reason);
        match (denial.shape, &denial.redirect_to) {
            (ResponseShape::Redirect, Some(location)) => {
                (StatusCode::FOUND, [(header::LOCATION, location.clone())]).into_response()
            }
            (ResponseShape::Json, _) => (status, Json(Value::Object(body_of(&denial.reason))))
                .into_response(),
            _ => (status, plain_text(&denial.reason)).into_response(),
        }
    }
}
