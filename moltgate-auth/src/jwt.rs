//! Signed-token verification against the issuer's published key set.
//!
//! Key sets are cached per issuer with a TTL. A token signed with a key id
//! that is not in a cached set triggers one refetch, so key rotation takes
//! effect without a restart.

use crate::config::JWKS_PATH;
use crate::error::{AuthResult, VerificationError, VerifyFailure};
use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Claims read from a verified access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub iss: String,
    pub exp: i64,
}

/// Verifies externally issued tokens.
#[async_trait]
pub trait JwtVerifier: Send + Sync {
    /// Checks signature, expiry, issuer and exact audience.
    async fn verify(&self, token: &str, issuer: &str, audience: &str) -> AuthResult<AccessClaims>;
}

/// Only asymmetric algorithms; HMAC would let a public key act as a secret.
const ACCEPTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Minimum gap between forced refetches triggered by an unknown `kid`.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(30);

/// [`JwtVerifier`] that fetches `<issuer>/cdn-cgi/access/certs`.
pub struct RemoteJwksVerifier {
    client: Client,
    ttl: Duration,
    refresh_cooldown: Duration,
    cache: RwLock<HashMap<String, CachedKeys>>,
}

impl RemoteJwksVerifier {
    pub fn new(ttl: Duration) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self::with_client(client, ttl)
    }

    pub fn with_client(client: Client, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    /// Drops every cached key set.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    fn jwks_url(issuer: &str) -> String {
        format!("{}{JWKS_PATH}", issuer.trim_end_matches('/'))
    }

    /// Returns the cached key set and its fetch time if still fresh.
    async fn cached(&self, issuer: &str) -> Option<(JwkSet, Instant)> {
        let cache = self.cache.read().await;
        cache
            .get(issuer)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| (entry.keys.clone(), entry.fetched_at))
    }

    async fn fetch(&self, issuer: &str) -> Result<JwkSet, VerifyFailure> {
        let url = Self::jwks_url(issuer);
        debug!("fetching key set from {url}");
        let keys: JwkSet = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut cache = self.cache.write().await;
        cache.insert(
            issuer.to_string(),
            CachedKeys {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(keys)
    }

    async fn verify_inner(
        &self,
        token: &str,
        issuer: &str,
        audience: &str,
    ) -> Result<AccessClaims, VerifyFailure> {
        let header = decode_header(token).map_err(VerifyFailure::Header)?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(VerifyFailure::Algorithm(header.alg));
        }
        let kid = header.kid.as_deref();

        // Fast path: fresh cached set that knows this key.
        let cached = self.cached(issuer).await;
        let jwk = match cached.as_ref().and_then(|(keys, _)| select_key(keys, kid)) {
            Some(jwk) => jwk.clone(),
            None => {
                // Callers choose the kid, so forced refetches are rate limited.
                if let Some((_, fetched_at)) = &cached {
                    if fetched_at.elapsed() < self.refresh_cooldown {
                        return Err(VerifyFailure::UnknownKey(header.kid.clone()));
                    }
                    debug!("kid {kid:?} not in cached key set, refetching");
                }
                let fresh = self.fetch(issuer).await?;
                select_key(&fresh, kid)
                    .cloned()
                    .ok_or_else(|| VerifyFailure::UnknownKey(header.kid.clone()))?
            }
        };

        let key = DecodingKey::from_jwk(&jwk).map_err(VerifyFailure::Key)?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let mut claims = decode::<AccessClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(VerifyFailure::Token)?;

        if claims.email.trim().is_empty() {
            match claims.sub.as_deref().map(str::trim) {
                Some(sub) if !sub.is_empty() => claims.email = sub.to_string(),
                _ => return Err(VerifyFailure::NoSubject),
            }
        }
        Ok(claims)
    }
}

/// Picks the key named by `kid`, or the only key when the token names none.
fn select_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => keys.find(kid),
        None if keys.keys.len() == 1 => keys.keys.first(),
        None => None,
    }
}

#[async_trait]
impl JwtVerifier for RemoteJwksVerifier {
    async fn verify(&self, token: &str, issuer: &str, audience: &str) -> AuthResult<AccessClaims> {
        self.verify_inner(token, issuer, audience)
            .await
            .map_err(|cause| {
                debug!("token verification failed: {cause}");
                VerificationError
            })
    }
}
