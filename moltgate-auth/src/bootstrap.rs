//! Shared-secret bootstrap authority.
//!
//! Used only while no identity provider is configured. Comparison hashes
//! both sides first so timing reveals neither content nor length.

use crate::config::{AccessConfig, IssuerState};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// True when bootstrap mode applies: no issuer fields and a secret set.
pub fn is_bootstrap_eligible(config: &AccessConfig) -> bool {
    config.issuer_state() == IssuerState::Unset && config.bootstrap_secret().is_some()
}

/// Constant-time comparison of a presented token with the expected secret.
///
/// Empty values never match.
pub fn check(provided: &str, expected: &str) -> bool {
    if provided.is_empty() || expected.is_empty() {
        return false;
    }
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}

/// Holds the digest of the bootstrap secret, never the secret itself.
pub struct BootstrapAuthority {
    digest: Zeroizing<[u8; 32]>,
}

impl BootstrapAuthority {
    /// Returns an authority when bootstrap mode applies to `config`.
    pub fn from_config(config: &AccessConfig) -> Option<Self> {
        if !is_bootstrap_eligible(config) {
            return None;
        }
        config.bootstrap_secret().map(|secret| Self {
            digest: Zeroizing::new(Sha256::digest(secret.as_bytes()).into()),
        })
    }

    pub fn verify(&self, provided: &str) -> bool {
        if provided.is_empty() {
            return false;
        }
        let presented: [u8; 32] = Sha256::digest(provided.as_bytes()).into();
        presented.as_slice().ct_eq(self.digest.as_slice()).into()
    }
}

impl std::fmt::Debug for BootstrapAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BootstrapAuthority(<redacted>)")
    }
}
