//! # aa-api: Axum service for the Account Aggregator consent flow
//!
//! ## API Surface
//!
//! | Path | Module | Operation |
//! |------|--------|-----------|
//! | `POST /v1/consent` | [`routes::consent`] | build + submit consent |
//! | `POST /v1/consent/status` | [`routes::consent`] | resolve handle |
//! | `POST /v1/consent/signature` | [`routes::consent`] | signed consent |
//! | `POST /v1/fi/request` | [`routes::fi`] | key material + FI request |
//! | `POST /v1/fi/fetch` | [`routes::fi`] | FI fetch + session discard |
//! | `GET /health/liveness` | here | liveness |
//! | `GET /openapi.json` | [`openapi`] | OpenAPI document |
//!
//! There is no inbound authentication and no retry. Consent status is
//! polled by the caller.

pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::consent::router())
        .merge(routes::fi::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}
