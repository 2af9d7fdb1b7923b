//! Server configuration, read once from the environment.

use moltgate_auth::AccessConfig;
use moltgate_cloud::{StorageSecrets, SyncConfig, is_valid_bucket_name};
use moltgate_sandbox::GatewayConfig;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:8787";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the server needs, as immutable values.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub access: AccessConfig,
    pub storage: StorageSecrets,
    pub gateway: GatewayConfig,
    pub sync: SyncConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8787)),
            access: AccessConfig::default(),
            storage: StorageSecrets::default(),
            gateway: GatewayConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// Flags are on only for the literal `true`.
fn flag(value: Option<String>) -> bool {
    value.as_deref() == Some("true")
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind = match var("MOLTGATE_BIND") {
            Some(value) => parse("MOLTGATE_BIND", &value)?,
            None => parse("MOLTGATE_BIND", DEFAULT_BIND)?,
        };

        let gateway_token = var("MOLTBOT_GATEWAY_TOKEN");

        let mut gateway = GatewayConfig {
            token: gateway_token.clone(),
            ..GatewayConfig::default()
        };
        if let Some(port) = var("OPENCLAW_GATEWAY_PORT") {
            gateway.port = parse("OPENCLAW_GATEWAY_PORT", &port)?;
        }

        let access = AccessConfig {
            team_domain: var("CF_ACCESS_TEAM_DOMAIN"),
            audience: var("CF_ACCESS_AUD"),
            bootstrap_token: gateway_token,
            dev_mode: flag(lookup("DEV_MODE")),
            e2e_test_mode: flag(lookup("E2E_TEST_MODE")),
            ..AccessConfig::default()
        };

        let storage = StorageSecrets {
            access_key_id: var("R2_ACCESS_KEY_ID"),
            secret_access_key: var("R2_SECRET_ACCESS_KEY"),
            account_id: var("CF_ACCOUNT_ID"),
            bucket_override: var("R2_BUCKET_NAME"),
        };
        if !is_valid_bucket_name(storage.bucket()) {
            return Err(ConfigError::InvalidValue {
                name: "R2_BUCKET_NAME",
                value: storage.bucket().to_string(),
                reason: "not a valid bucket name".to_string(),
            });
        }

        Ok(Self {
            bind,
            access,
            storage,
            gateway,
            sync: SyncConfig::default(),
        })
    }
}
