//! Access middleware for the administrative routes.

use crate::state::AppState;
use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use moltgate_auth::{AccessDecision, AccessRequest, ResponseShape};
use std::collections::HashMap;

pub const GATEWAY_TOKEN_HEADER: &str = "x-gateway-token";
pub const ACCESS_JWT_HEADER: &str = "cf-access-jwt-assertion";
pub const ACCESS_COOKIE: &str = "CF_Authorization";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Finds `name` among all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Collects the authentication inputs of `request`.
pub fn access_request(request: &Request) -> AccessRequest {
    let headers = request.headers();
    let query_token = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove("token"));

    AccessRequest {
        query_token,
        header_token: header_value(headers, GATEWAY_TOKEN_HEADER),
        jwt_header: header_value(headers, ACCESS_JWT_HEADER),
        jwt_cookie: cookie_value(headers, ACCESS_COOKIE),
        shape: ResponseShape::from_accept(
            headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()),
        ),
    }
}

/// Admits the request with its `Identity` attached, or renders the denial.
pub async fn require_access(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let access = access_request(&request);
    match state.gate.authorize(&access).await {
        AccessDecision::Allow(identity) => {
            tracing::debug!(
                "{} {} allowed for {} ({:?})",
                request.method(),
                request.uri().path(),
                identity.email,
                identity.auth_method
            );
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        AccessDecision::Deny(denial) => {
            tracing::info!(
                "{} {} denied: {}",
                request.method(),
                request.uri().path(),
                denial.reason.message()
            );
            state.responder.deny(&denial)
        }
    }
}
