//! # Application State
//!
//! Shared state passed to all route handlers via the `State` extractor:
//! the consent flow (AA client, key-material provider, session store) and
//! the consent payload builder.

use std::sync::Arc;

use aa_client::{ConsentFlow, ConsentPayloadBuilder};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Server settings read at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    /// Read `AA_API_PORT` (default 8080).
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("AA_API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Shared application state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub flow: ConsentFlow,
    pub builder: Arc<ConsentPayloadBuilder>,
}

impl AppState {
    pub fn new(flow: ConsentFlow, builder: ConsentPayloadBuilder) -> Self {
        Self {
            flow,
            builder: Arc::new(builder),
        }
    }
}
