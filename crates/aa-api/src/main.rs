//! # aa-api: Binary Entry Point
//!
//! Loads `.env` when present, reads configuration from the environment,
//! and serves the consent API.

use std::sync::Arc;

use aa_client::{AaApiConfig, AaClient, ConsentFlow, ConsentPayloadBuilder, SessionStore};
use aa_crypto::KeyPolicy;
use anyhow::Context;

use aa_api::state::{AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to read .env");
        }
    }

    init_tracing();

    let server = ServerConfig::from_env();
    let config = AaApiConfig::from_env().context("AA API configuration")?;
    tracing::info!(?config, "AA API client configured");

    let policy = KeyPolicy::from_env().context("key material policy")?;
    let keys = policy.into_provider().context("key material provider")?;
    tracing::info!(provider = keys.provider_name(), "key material provider ready");

    let client = AaClient::new(config).context("AA API client")?;
    let flow = ConsentFlow::new(client, Arc::from(keys), SessionStore::new());
    let app = aa_api::app(AppState::new(flow, ConsentPayloadBuilder::default()));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], server.port));
    tracing::info!("AA API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` filter (default `info`); `AA_LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("AA_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
