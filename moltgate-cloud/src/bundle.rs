//! Transfer-tool credential bundles.
//!
//! A bundle is the minimal rclone configuration needed for one transfer.
//! It is rebuilt from the raw secrets for every operation, so a rotated
//! secret is picked up on the very next call.

use crate::config::StorageSecrets;
use crate::error::{CloudResult, SyncError};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Credentials for one rclone invocation against R2.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CredentialBundle {
    access_key: String,
    secret_key: String,
    endpoint: String,
    bucket: String,
}

/// Trims and drops control characters so a value cannot break out of its
/// INI line.
fn sanitize(value: &str) -> String {
    value.trim().chars().filter(|c| !c.is_control()).collect()
}

/// R2 bucket naming: 3 to 63 lowercase letters, digits, `-` or `.`,
/// starting and ending with a letter or digit.
pub fn is_valid_bucket_name(name: &str) -> bool {
    let edge = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && edge(name.chars().next())
        && edge(name.chars().last())
}

impl CredentialBundle {
    /// Derives a bundle from the configured secrets.
    ///
    /// Fails on a bucket override that is not a valid bucket name, since the
    /// name ends up in transfer command lines.
    pub fn build(secrets: &StorageSecrets) -> CloudResult<Self> {
        let missing = secrets.missing();
        if !missing.is_empty() {
            return Err(SyncError::not_configured(missing));
        }

        let bucket = sanitize(secrets.bucket());
        if !is_valid_bucket_name(&bucket) {
            return Err(SyncError::InvalidBucket(bucket));
        }

        let field = |v: &Option<String>| sanitize(v.as_deref().unwrap_or_default());
        let account_id = field(&secrets.account_id);

        Ok(Self {
            access_key: field(&secrets.access_key_id),
            secret_key: field(&secrets.secret_access_key),
            endpoint: format!("https://{account_id}.r2.cloudflarestorage.com"),
            bucket,
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// rclone path of the bucket root, e.g. `r2:moltbot-data/`.
    pub fn remote_root(&self, remote_name: &str) -> String {
        format!("{remote_name}:{}/", self.bucket)
    }

    /// Renders the bundle as an rclone config section.
    pub fn render(&self, remote_name: &str) -> String {
        format!(
            "[{remote_name}]\n\
             type = s3\n\
             provider = Cloudflare\n\
             access_key_id = {}\n\
             secret_access_key = {}\n\
             endpoint = {}\n\
             acl = private\n\
             no_check_bucket = true\n",
            self.access_key, self.secret_key, self.endpoint
        )
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("endpoint", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}
