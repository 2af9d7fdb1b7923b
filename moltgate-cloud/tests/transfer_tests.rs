//! Credential file lifetime around single transfer invocations.

use moltgate_cloud::transfer::run_scoped;
use moltgate_cloud::{StorageSecrets, SyncConfig, SyncError};
use moltgate_sandbox::mock::ScriptedSandbox;
use moltgate_sandbox::{LocalSandbox, SandboxClient};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

mod support;

fn local_setup() -> (TempDir, Arc<dyn SandboxClient>, SyncConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        scratch_dir: dir.path().to_string_lossy().into_owned(),
        ..SyncConfig::default()
    };
    (dir, Arc::new(LocalSandbox::new()), config)
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn command_sees_rendered_bundle_and_file_is_removed() {
    let (dir, sandbox, config) = local_setup();
    let secrets = support::full_secrets();

    let output = run_scoped(&sandbox, &secrets, &config, "cat {config}", Duration::from_secs(10))
        .await
        .unwrap();

    assert!(output.success);
    assert!(output.stdout.starts_with("[r2]\n"));
    assert!(output.stdout.contains("access_key_id = AKIAEXAMPLEKEY123"));
    assert_eq!(entries(dir.path()), 0);
}

#[tokio::test]
async fn file_is_removed_after_failed_command() {
    let (dir, sandbox, config) = local_setup();
    let secrets = support::full_secrets();

    let output = run_scoped(
        &sandbox,
        &secrets,
        &config,
        "test -s {config} && echo denied >&2 && exit 3",
        Duration::from_secs(10),
    )
    .await
    .unwrap();

    assert!(!output.success);
    assert_eq!(output.exit_code, Some(3));
    assert_eq!(output.stderr.trim(), "denied");
    assert_eq!(entries(dir.path()), 0);
}

#[tokio::test]
async fn file_is_removed_after_timeout() {
    let (dir, sandbox, config) = local_setup();
    let secrets = support::full_secrets();

    let err = run_scoped(&sandbox, &secrets, &config, "sleep 5", Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Sandbox(ref e) if e.is_timeout()));
    assert_eq!(entries(dir.path()), 0);
}

#[tokio::test]
async fn unconfigured_secrets_never_touch_the_sandbox() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    let client: Arc<dyn SandboxClient> = sandbox.clone();

    let err = run_scoped(
        &client,
        &StorageSecrets::default(),
        &SyncConfig::default(),
        "rclone --config {config} lsd r2:",
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SyncError::NotConfigured { .. }));
    assert!(sandbox.commands().is_empty());
    assert!(sandbox.written_paths().is_empty());
}

#[tokio::test]
async fn every_call_gets_a_distinct_file() {
    let sandbox = Arc::new(ScriptedSandbox::new());
    let client: Arc<dyn SandboxClient> = sandbox.clone();
    let secrets = support::full_secrets();
    let config = SyncConfig::default();

    for _ in 0..3 {
        run_scoped(&client, &secrets, &config, "rclone --config {config} lsd r2:", Duration::from_secs(5))
            .await
            .unwrap();
    }

    let written = sandbox.written_paths();
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|p| support::is_credential_file(p)));
    let unique: HashSet<&String> = written.iter().collect();
    assert_eq!(unique.len(), 3);
    assert_eq!(sandbox.removed_paths(), written);
    assert!(sandbox.file_paths().is_empty());

    for (call, path) in sandbox.calls().iter().zip(&written) {
        assert_eq!(call.command, format!("rclone --config {path} lsd r2:"));
        assert!(call.files_present.contains(path));
    }
}
