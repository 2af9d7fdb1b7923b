//! Administrative endpoints with the gate bypassed.

use axum::http::StatusCode;
use moltgate_sandbox::ExecOutput;
use moltgate_sandbox::mock::ScriptedSandbox;
use moltgate_server::handlers::gateway::update_available;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

mod support;
use support::*;

const LISTING: &str = r#"{"pending":[{"requestId":"r1","deviceId":"d1","ts":1},{"requestId":"r2","deviceId":"d2","ts":2}],"paired":[]}"#;

fn with_config_layout(sandbox: &ScriptedSandbox) {
    sandbox
        .on("test -f /root/.openclaw/openclaw.json", ExecOutput::ok(""))
        .on("r2:moltbot-data/openclaw/", ExecOutput::ok(""));
}

// ── Devices ──

#[tokio::test]
async fn devices_lists_pending_and_paired() {
    let sandbox = running_sandbox();
    sandbox.on("devices list --json", ExecOutput::ok(format!("connecting\n{LISTING}")));

    let (status, body) = send(app(dev_config(), &sandbox), get("/api/admin/devices")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"][1]["requestId"], "r2");
    assert_eq!(body["paired"], json!([]));
}

#[tokio::test]
async fn unparsable_device_list_is_reported_with_raw_output() {
    let sandbox = running_sandbox();
    sandbox.on(
        "devices list --json",
        ExecOutput::failed(1, "gateway closed").with_stdout("no devices here"),
    );

    let (status, body) = send(app(dev_config(), &sandbox), get("/api/admin/devices")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"], json!([]));
    assert_eq!(body["raw"], "no devices here");
    assert_eq!(body["stderr"], "gateway closed");
    assert!(body.get("parseError").is_none());
}

#[tokio::test]
async fn device_list_timeout_is_a_server_error() {
    let sandbox = running_sandbox();
    sandbox.on_timeout("devices list");

    let (status, body) = send(app(dev_config(), &sandbox), get("/api/admin/devices")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn approve_reports_cli_output() {
    let sandbox = running_sandbox();
    sandbox.on("devices approve r1", ExecOutput::ok("Approved r1"));

    let (status, body) = send(
        app(dev_config(), &sandbox),
        post("/api/admin/devices/r1/approve"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["requestId"], "r1");
    assert_eq!(body["message"], "Device approved");
    assert_eq!(body["stdout"], "Approved r1");
}

#[tokio::test]
async fn approve_with_unsafe_id_is_a_bad_request() {
    let sandbox = running_sandbox();
    let (status, body) = send(
        app(dev_config(), &sandbox),
        post("/api/admin/devices/r1$(id)/approve"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid request id"));
    assert!(sandbox.commands().is_empty());
}

#[tokio::test]
async fn approve_all_reports_partial_failures() {
    let sandbox = running_sandbox();
    sandbox
        .on("devices list --json", ExecOutput::ok(LISTING))
        .on("devices approve r1", ExecOutput::ok("approved"))
        .on("devices approve r2", ExecOutput::failed(1, "expired"));

    let (status, body) = send(
        app(dev_config(), &sandbox),
        post("/api/admin/devices/approve-all"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved"], json!(["r1"]));
    assert_eq!(body["failed"][0]["requestId"], "r2");
    assert_eq!(body["failed"][0]["error"], "expired");
    assert_eq!(body["message"], "Approved 1 of 2 pending device(s)");
}

// ── Storage ──

#[tokio::test]
async fn storage_status_lists_missing_secrets() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    let (status, body) = send(app(dev_config(), &sandbox), get("/api/admin/storage")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], false);
    assert_eq!(
        body["missing"],
        json!(["R2_ACCESS_KEY_ID", "R2_SECRET_ACCESS_KEY", "CF_ACCOUNT_ID"])
    );
    assert_eq!(body["lastSync"], json!(null));
}

#[tokio::test]
async fn storage_test_unconfigured_is_a_bad_request() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    let (status, body) = send(app(dev_config(), &sandbox), get("/api/admin/storage/test")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["missing"].as_array().unwrap().len(), 3);
    assert!(sandbox.commands().is_empty());
}

#[tokio::test]
async fn storage_test_returns_probe_report() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    sandbox.on("size r2:moltbot-data", ExecOutput::ok("Total objects: 0"));

    let (status, body) = send(
        app(with_storage(dev_config()), &sandbox),
        get("/api/admin/storage/test"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["bucket"], "moltbot-data");
    assert_eq!(body["diagnostics"]["accessKeyPreview"], "AKIA...Y123");
    assert!(!body.to_string().contains("super-secret-value"));
}

#[tokio::test]
async fn storage_sync_unconfigured_is_a_bad_request() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    let (status, body) = send(app(dev_config(), &sandbox), post("/api/admin/storage/sync")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "R2 storage is not configured");
    assert!(sandbox.commands().is_empty());
}

#[tokio::test]
async fn storage_sync_success_reports_last_sync() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    with_config_layout(&sandbox);

    let (status, body) = send(
        app(with_storage(dev_config()), &sandbox),
        post("/api/admin/storage/sync"),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["lastSync"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn storage_sync_failure_is_a_server_error() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    sandbox
        .on("test -f /root/.openclaw/openclaw.json", ExecOutput::ok(""))
        .on("r2:moltbot-data/openclaw/", ExecOutput::failed(1, "AccessDenied"));

    let (status, body) = send(
        app(with_storage(dev_config()), &sandbox),
        post("/api/admin/storage/sync"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Config sync failed");
    assert_eq!(body["details"], "AccessDenied");
}

// ── Gateway ──

#[tokio::test]
async fn restart_reports_previous_process() {
    let sandbox = running_sandbox();
    let (status, body) = send(
        app(dev_config(), &sandbox),
        post("/api/admin/gateway/restart"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["previousProcessId"], "gw");
    assert_eq!(sandbox.processes().len(), 2);
}

#[tokio::test]
async fn version_compares_current_and_latest() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    sandbox
        .on("openclaw --version", ExecOutput::ok("openclaw 2026.2.9"))
        .on("npm view openclaw version", ExecOutput::ok("2026.2.12\n"));

    let (status, body) = send(app(dev_config(), &sandbox), get("/api/admin/openclaw/version")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], "2026.2.9");
    assert_eq!(body["latest"], "2026.2.12");
    assert_eq!(body["updateAvailable"], true);
}

#[tokio::test]
async fn version_lookup_failure_nulls_both_versions() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    sandbox.on_timeout("openclaw --version");

    let (status, body) = send(app(dev_config(), &sandbox), get("/api/admin/openclaw/version")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["current"], json!(null));
    assert_eq!(body["latest"], json!(null));
    assert!(body["error"].is_string());
}

#[test]
fn update_available_compares_numerically() {
    assert!(update_available(Some("2026.2.9"), Some("2026.2.12")));
    assert!(!update_available(Some("2026.2.12"), Some("2026.2.12")));
    assert!(!update_available(Some("2026.3.0"), Some("2026.2.12")));
    assert!(!update_available(None, Some("2026.2.12")));
    assert!(!update_available(Some("2026.2.12"), None));
}

#[tokio::test]
async fn update_rejects_malformed_versions() {
    for version in ["v1.2", "1.2", "1.2.3.4", "1.2.3; reboot"] {
        let sandbox = running_sandbox();
        let (status, body) = send(
            app(dev_config(), &sandbox),
            post_json("/api/admin/openclaw/update", json!({ "version": version })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{version}");
        assert!(body["error"].as_str().unwrap().contains("invalid version format"));
        assert!(sandbox.commands().is_empty());
    }
}

#[tokio::test]
async fn update_without_storage_warns_that_pin_is_not_persisted() {
    let sandbox = running_sandbox();
    sandbox.on("npm install -g openclaw@2026.2.12", ExecOutput::ok("added 1 package"));

    let (status, body) = send(
        app(dev_config(), &sandbox),
        post_json("/api/admin/openclaw/update", json!({ "version": "2026.2.12" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["syncPersisted"], false);
    assert!(body["warning"].as_str().unwrap().contains("not configured"));
    assert_eq!(
        sandbox.file("/root/.openclaw/version-override").unwrap(),
        b"2026.2.12\n"
    );
    assert_eq!(sandbox.processes().len(), 2);
}

#[tokio::test]
async fn update_with_storage_persists_pin_before_restart() {
    let sandbox = running_sandbox();
    with_config_layout(&sandbox);
    sandbox.on("npm install -g", ExecOutput::ok("added 1 package"));

    let (status, body) = send(
        app(with_storage(dev_config()), &sandbox),
        post_json("/api/admin/openclaw/update", json!({ "version": "2026.2.12" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["syncPersisted"], true);
    assert!(body.get("warning").is_none());
    assert_eq!(sandbox.count_matching("r2:moltbot-data/openclaw/"), 1);
}

#[tokio::test]
async fn failed_install_neither_pins_nor_restarts() {
    let sandbox = running_sandbox();
    sandbox.on("npm install -g", ExecOutput::failed(1, "E404 not found"));

    let (status, body) = send(
        app(dev_config(), &sandbox),
        post_json("/api/admin/openclaw/update", json!({ "version": "2026.2.12" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("E404"));
    assert!(sandbox.file("/root/.openclaw/version-override").is_none());
    assert_eq!(sandbox.processes().len(), 1);
}

// ── Secret hygiene ──

#[tokio::test]
async fn cli_failures_never_echo_the_gateway_token() {
    let mut config = dev_config();
    config.gateway.token = Some("gw-s3cret".to_string());

    let sandbox = running_sandbox();
    sandbox.on_timeout("devices list");
    let (status, body) = send(app(config.clone(), &sandbox), get("/api/admin/devices")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
    assert!(!body.to_string().contains("gw-s3cret"));

    let sandbox = running_sandbox();
    sandbox
        .on("devices list --json", ExecOutput::ok(LISTING))
        .on_timeout("devices approve");
    let (status, body) = send(app(config, &sandbox), post("/api/admin/devices/approve-all")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["failed"].as_array().unwrap().len(), 2);
    assert!(body["failed"][0]["error"].as_str().unwrap().contains("timed out"));
    assert!(!body.to_string().contains("gw-s3cret"));
}
