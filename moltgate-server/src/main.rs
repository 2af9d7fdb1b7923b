use anyhow::Context;
use moltgate_auth::{IssuerState, RemoteJwksVerifier};
use moltgate_sandbox::{LocalSandbox, SandboxClient};
use moltgate_server::{AppState, ServerConfig, router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    if config.access.bypass_enabled() {
        warn!("DEV_MODE/E2E_TEST_MODE set: admin authentication is disabled");
    }
    match config.access.issuer_state() {
        IssuerState::Configured { issuer, .. } => info!("admin access via issuer {issuer}"),
        IssuerState::Partial => warn!("identity provider half-configured, admin API will refuse"),
        IssuerState::Unset if config.access.bootstrap_secret().is_some() => {
            info!("admin access via bootstrap token")
        }
        IssuerState::Unset => warn!("no admin access method configured"),
    }
    if !config.storage.missing().is_empty() {
        warn!("storage not configured, missing {:?}", config.storage.missing());
    }

    let sandbox: Arc<dyn SandboxClient> = Arc::new(LocalSandbox::new());
    let verifier = Arc::new(RemoteJwksVerifier::new(config.access.jwks_cache_ttl()));
    let bind = config.bind;
    let app = router(AppState::new(config, sandbox, verifier));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("moltgate listening on {bind}");
    axum::serve(listener, app).await?;

    Ok(())
}
