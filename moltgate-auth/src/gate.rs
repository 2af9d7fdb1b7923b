//! The access gate.

use crate::bootstrap::BootstrapAuthority;
use crate::config::{AccessConfig, IssuerState};
use crate::identity::{AccessDecision, Denial, DenyReason, Identity, ResponseShape};
use crate::jwt::JwtVerifier;
use std::sync::Arc;
use tracing::{debug, warn};

const BOOTSTRAP_HINT: &str =
    "Provide the gateway token via the ?token= query parameter or the X-Gateway-Token header";
const MISSING_JWT_HINT: &str =
    "Missing access token: expected CF-Access-JWT-Assertion header or CF_Authorization cookie";
const NOT_CONFIGURED_MESSAGE: &str = "Admin access is not configured. Set MOLTBOT_GATEWAY_TOKEN \
     for bootstrap access, or CF_ACCESS_TEAM_DOMAIN and CF_ACCESS_AUD for identity-provider access.";
const PARTIAL_ISSUER_MESSAGE: &str = "Admin access is misconfigured: CF_ACCESS_TEAM_DOMAIN and \
     CF_ACCESS_AUD must be set together.";

/// Authentication inputs extracted from one HTTP request.
#[derive(Clone, Debug, Default)]
pub struct AccessRequest {
    /// `token` query parameter.
    pub query_token: Option<String>,
    /// `X-Gateway-Token` header.
    pub header_token: Option<String>,
    /// `CF-Access-JWT-Assertion` header.
    pub jwt_header: Option<String>,
    /// `CF_Authorization` cookie.
    pub jwt_cookie: Option<String>,
    pub shape: ResponseShape,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl AccessRequest {
    /// Bootstrap token; the query parameter wins over the header.
    pub fn bootstrap_token(&self) -> Option<&str> {
        present(&self.query_token).or_else(|| present(&self.header_token))
    }

    /// Access token; the header wins over the cookie.
    pub fn access_token(&self) -> Option<&str> {
        present(&self.jwt_header).or_else(|| present(&self.jwt_cookie))
    }
}

/// Decides, for every administrative request, whether it may proceed.
pub struct AccessGate {
    config: AccessConfig,
    verifier: Arc<dyn JwtVerifier>,
    bootstrap: Option<BootstrapAuthority>,
}

impl AccessGate {
    pub fn new(config: AccessConfig, verifier: Arc<dyn JwtVerifier>) -> Self {
        let bootstrap = BootstrapAuthority::from_config(&config);
        Self {
            config,
            verifier,
            bootstrap,
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Authorizes one request. Total: every input yields a decision.
    pub async fn authorize(&self, request: &AccessRequest) -> AccessDecision {
        if self.config.bypass_enabled() {
            return AccessDecision::Allow(Identity::dev());
        }

        match self.config.issuer_state() {
            IssuerState::Unset => self.authorize_bootstrap(request),
            IssuerState::Partial => {
                warn!("identity provider is half-configured, refusing all requests");
                self.deny(
                    request,
                    DenyReason::NotConfigured {
                        message: PARTIAL_ISSUER_MESSAGE.to_string(),
                    },
                    None,
                )
            }
            IssuerState::Configured { issuer, audience } => {
                self.authorize_access(request, &issuer, &audience).await
            }
        }
    }

    fn authorize_bootstrap(&self, request: &AccessRequest) -> AccessDecision {
        let Some(ref authority) = self.bootstrap else {
            warn!("no identity provider and no gateway token configured");
            return self.deny(
                request,
                DenyReason::NotConfigured {
                    message: NOT_CONFIGURED_MESSAGE.to_string(),
                },
                None,
            );
        };

        match request.bootstrap_token() {
            Some(token) if authority.verify(token) => AccessDecision::Allow(Identity::bootstrap()),
            provided => {
                debug!(
                    "bootstrap token {}",
                    if provided.is_some() { "mismatch" } else { "missing" }
                );
                self.deny(
                    request,
                    DenyReason::Unauthorized {
                        hint: Some(BOOTSTRAP_HINT.to_string()),
                        details: None,
                    },
                    None,
                )
            }
        }
    }

    async fn authorize_access(
        &self,
        request: &AccessRequest,
        issuer: &str,
        audience: &str,
    ) -> AccessDecision {
        let Some(token) = request.access_token() else {
            let redirect_to = match request.shape {
                ResponseShape::Redirect => self.config.login_url(),
                _ => None,
            };
            return self.deny(
                request,
                DenyReason::Unauthorized {
                    hint: Some(MISSING_JWT_HINT.to_string()),
                    details: None,
                },
                redirect_to,
            );
        };

        match self.verifier.verify(token, issuer, audience).await {
            Ok(claims) => AccessDecision::Allow(Identity::access(claims.email, claims.name)),
            Err(e) => self.deny(
                request,
                DenyReason::Unauthorized {
                    hint: None,
                    details: Some(e.to_string()),
                },
                None,
            ),
        }
    }

    /// A redirect-shaped request with nowhere to redirect falls back to a
    /// plain page.
    fn deny(
        &self,
        request: &AccessRequest,
        reason: DenyReason,
        redirect_to: Option<String>,
    ) -> AccessDecision {
        let shape = match (request.shape, &redirect_to) {
            (ResponseShape::Redirect, None) => ResponseShape::Html,
            (shape, _) => shape,
        };
        AccessDecision::Deny(Denial {
            reason,
            shape,
            redirect_to,
        })
    }
}
