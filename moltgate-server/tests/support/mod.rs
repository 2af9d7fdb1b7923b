#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use moltgate_auth::{AccessClaims, AuthResult, JwtVerifier, VerificationError};
use moltgate_sandbox::ProcessStatus;
use moltgate_sandbox::mock::ScriptedSandbox;
use moltgate_server::{AppState, ServerConfig, router};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const BOOTSTRAP_TOKEN: &str = "s3cret-token";
pub const TEAM_DOMAIN: &str = "team.cloudflareaccess.com";
pub const GOOD_JWT: &str = "good.jwt.token";

/// Accepts only [`GOOD_JWT`].
pub struct StubVerifier;

#[async_trait]
impl JwtVerifier for StubVerifier {
    async fn verify(&self, token: &str, issuer: &str, _audience: &str) -> AuthResult<AccessClaims> {
        if token != GOOD_JWT {
            return Err(VerificationError);
        }
        Ok(AccessClaims {
            email: "admin@example.com".to_string(),
            name: None,
            sub: None,
            iss: issuer.to_string(),
            exp: i64::MAX,
        })
    }
}

pub fn dev_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.access.dev_mode = true;
    config
}

pub fn bootstrap_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.access.bootstrap_token = Some(BOOTSTRAP_TOKEN.to_string());
    config
}

pub fn issuer_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.access.team_domain = Some(TEAM_DOMAIN.to_string());
    config.access.audience = Some("aud-1234".to_string());
    config
}

/// Adds complete storage secrets with a zero probe retry delay.
pub fn with_storage(mut config: ServerConfig) -> ServerConfig {
    config.storage.access_key_id = Some("AKIAEXAMPLEKEY123".to_string());
    config.storage.secret_access_key = Some("super-secret-value".to_string());
    config.storage.account_id = Some("0123456789abcdef".to_string());
    config.sync.probe_retry_delay_ms = 0;
    config
}

pub fn running_sandbox() -> Arc<ScriptedSandbox> {
    let sandbox = Arc::new(ScriptedSandbox::new());
    sandbox.with_process("gw", "openclaw gateway", ProcessStatus::Running);
    sandbox
}

pub fn app(config: ServerConfig, sandbox: &Arc<ScriptedSandbox>) -> Router {
    router(AppState::new(config, sandbox.clone(), Arc::new(StubVerifier)))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn raw(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Sends `request` and parses the body as JSON (`Null` when it is not).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = raw(app, request).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
