use moltgate_cloud::{CredentialBundle, StorageSecrets, SyncError, is_valid_bucket_name};
use pretty_assertions::assert_eq;

fn secrets() -> StorageSecrets {
    StorageSecrets {
        access_key_id: Some("AKIA123".into()),
        secret_access_key: Some("s3cr3t".into()),
        account_id: Some("acct42".into()),
        bucket_override: None,
    }
}

#[test]
fn render_produces_cloudflare_s3_section() {
    let bundle = CredentialBundle::build(&secrets()).unwrap();
    assert_eq!(
        bundle.render("r2"),
        "[r2]\n\
         type = s3\n\
         provider = Cloudflare\n\
         access_key_id = AKIA123\n\
         secret_access_key = s3cr3t\n\
         endpoint = https://acct42.r2.cloudflarestorage.com\n\
         acl = private\n\
         no_check_bucket = true\n"
    );
}

#[test]
fn values_are_trimmed_and_stripped_of_control_characters() {
    let raw = StorageSecrets {
        access_key_id: Some("  AKIA123\n".into()),
        secret_access_key: Some("s3cr3t\r\n[evil]".into()),
        account_id: Some("\tacct42 ".into()),
        bucket_override: Some(" other-bucket ".into()),
    };
    let bundle = CredentialBundle::build(&raw).unwrap();
    assert_eq!(bundle.access_key(), "AKIA123");
    assert_eq!(bundle.endpoint(), "https://acct42.r2.cloudflarestorage.com");
    assert_eq!(bundle.bucket(), "other-bucket");

    let rendered = bundle.render("r2");
    assert!(rendered.contains("secret_access_key = s3cr3t[evil]\n"));
    assert_eq!(rendered.lines().count(), 8);
}

#[test]
fn build_fails_when_not_configured() {
    let mut partial = secrets();
    partial.account_id = None;
    match CredentialBundle::build(&partial) {
        Err(SyncError::NotConfigured { missing }) => assert_eq!(missing, vec!["CF_ACCOUNT_ID"]),
        other => panic!("expected NotConfigured, got {other:?}"),
    }
}

#[test]
fn rebuilt_bundle_reflects_rotated_secret() {
    let before = CredentialBundle::build(&secrets()).unwrap();
    let mut rotated = secrets();
    rotated.secret_access_key = Some("rotated".into());
    let after = CredentialBundle::build(&rotated).unwrap();
    assert_ne!(before, after);
    assert!(after.render("r2").contains("secret_access_key = rotated\n"));
}

#[test]
fn remote_root_uses_bucket() {
    let bundle = CredentialBundle::build(&secrets()).unwrap();
    assert_eq!(bundle.remote_root("r2"), "r2:moltbot-data/");
}

#[test]
fn debug_is_redacted() {
    let bundle = CredentialBundle::build(&secrets()).unwrap();
    let debug = format!("{bundle:?}");
    assert!(!debug.contains("AKIA123"));
    assert!(!debug.contains("s3cr3t"));
    assert!(!debug.contains("acct42"));
    assert!(debug.contains("moltbot-data"));
}

#[test]
fn bucket_names_follow_r2_rules() {
    for ok in ["moltbot-data", "abc", "team.backups-2", &"a".repeat(63)] {
        assert!(is_valid_bucket_name(ok), "{ok} should be accepted");
    }
    for bad in [
        "ab",
        "Upper",
        "-leading",
        "trailing.",
        "with space",
        "data;rm",
        "x/../y",
        &"a".repeat(64),
    ] {
        assert!(!is_valid_bucket_name(bad), "{bad} should be rejected");
    }
}

#[test]
fn build_rejects_invalid_bucket_override() {
    let mut raw = secrets();
    raw.bucket_override = Some("data $(id)".into());
    match CredentialBundle::build(&raw) {
        Err(SyncError::InvalidBucket(bucket)) => assert_eq!(bucket, "data $(id)"),
        other => panic!("expected InvalidBucket, got {other:?}"),
    }
}
