//! Access gate configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where the issuer's public key set is published, relative to the issuer.
pub const JWKS_PATH: &str = "/cdn-cgi/access/certs";

/// Immutable configuration for the access gate.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Identity provider team domain, e.g. `myteam.cloudflareaccess.com`.
    pub team_domain: Option<String>,

    /// Expected `aud` claim of issued tokens.
    pub audience: Option<String>,

    /// Shared secret accepted while no identity provider is configured.
    #[serde(skip_serializing)]
    pub bootstrap_token: Option<String>,

    /// Local development bypass.
    pub dev_mode: bool,

    /// End-to-end test bypass.
    pub e2e_test_mode: bool,

    /// How long a fetched key set is trusted before refetching.
    pub jwks_cache_ttl_secs: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            team_domain: None,
            audience: None,
            bootstrap_token: None,
            dev_mode: false,
            e2e_test_mode: false,
            jwks_cache_ttl_secs: 600,
        }
    }
}

/// How much of the identity provider is configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuerState {
    /// Neither team domain nor audience is set.
    Unset,
    /// Exactly one of the two is set.
    Partial,
    Configured { issuer: String, audience: String },
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AccessConfig {
    pub fn bypass_enabled(&self) -> bool {
        self.dev_mode || self.e2e_test_mode
    }

    pub fn bootstrap_secret(&self) -> Option<&str> {
        non_blank(&self.bootstrap_token)
    }

    pub fn issuer_state(&self) -> IssuerState {
        match (non_blank(&self.team_domain), non_blank(&self.audience)) {
            (None, None) => IssuerState::Unset,
            (Some(domain), Some(audience)) => IssuerState::Configured {
                issuer: issuer_url(domain),
                audience: audience.to_string(),
            },
            _ => IssuerState::Partial,
        }
    }

    /// Login URL for redirect-shaped denials.
    pub fn login_url(&self) -> Option<String> {
        non_blank(&self.team_domain).map(issuer_url)
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }
}

/// `https://<team-domain>`, tolerating a domain given with a scheme or a
/// trailing slash.
pub fn issuer_url(team_domain: &str) -> String {
    let host = team_domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("https://{host}")
}

impl fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessConfig")
            .field("team_domain", &self.team_domain)
            .field("audience", &self.audience)
            .field(
                "bootstrap_token",
                &self.bootstrap_secret().map(|_| "<redacted>"),
            )
            .field("dev_mode", &self.dev_mode)
            .field("e2e_test_mode", &self.e2e_test_mode)
            .field("jwks_cache_ttl_secs", &self.jwks_cache_ttl_secs)
            .finish()
    }
}
