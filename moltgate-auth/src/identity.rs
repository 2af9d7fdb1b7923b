//! Authorization outcomes.

use serde::{Deserialize, Serialize};

/// Which strategy admitted the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Dev,
    Bootstrap,
    Access,
}

/// The authorized caller of one request. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    pub name: String,
    pub auth_method: AuthMethod,
}

impl Identity {
    pub fn dev() -> Self {
        Self {
            email: "dev@localhost".to_string(),
            name: "Dev User".to_string(),
            auth_method: AuthMethod::Dev,
        }
    }

    pub fn bootstrap() -> Self {
        Self {
            email: "bootstrap@localhost".to_string(),
            name: "Bootstrap Admin".to_string(),
            auth_method: AuthMethod::Bootstrap,
        }
    }

    /// Identity from verified token claims; `name` falls back to `email`.
    pub fn access(email: impl Into<String>, name: Option<String>) -> Self {
        let email = email.into();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());
        Self {
            email,
            name,
            auth_method: AuthMethod::Access,
        }
    }
}

/// How the caller wants a denial delivered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    #[default]
    Json,
    Html,
    Redirect,
}

impl ResponseShape {
    /// Browsers (`Accept: text/html`) get redirect-shaped denials.
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(accept) if accept.contains("text/html") => Self::Redirect,
            _ => Self::Json,
        }
    }
}

/// Why a request was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// The caller failed to authenticate.
    Unauthorized {
        hint: Option<String>,
        details: Option<String>,
    },
    /// The gate cannot authorize anyone until it is configured.
    NotConfigured { message: String },
}

impl DenyReason {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::NotConfigured { .. } => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized { .. } => "Unauthorized",
            Self::NotConfigured { message } => message,
        }
    }
}

/// A refusal together with how it should be delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenyReason,
    pub shape: ResponseShape,
    pub redirect_to: Option<String>,
}

/// Outcome of authorizing one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allow(Identity),
    Deny(Denial),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Allow(identity) => Some(identity),
            Self::Deny(_) => None,
        }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Allow(_) => None,
            Self::Deny(denial) => Some(denial),
        }
    }
}
