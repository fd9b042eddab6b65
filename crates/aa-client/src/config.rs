//! AA API client configuration.
//!
//! One explicit configuration object handed to [`crate::AaClient::new`].
//! The default base URL points at the Sahamati sandbox proxy. Override via
//! environment variables or explicit construction for other environments.

use url::Url;
use zeroize::Zeroizing;

/// Default AA sandbox base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.sandbox.sahamati.org.in/proxy/v2";

/// Default outbound request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the Account Aggregator API.
///
/// Custom `Debug` implementation redacts the bearer token and the detached
/// signature to prevent credential leakage in log output.
#[derive(Clone)]
pub struct AaApiConfig {
    /// Base URL; endpoint paths (`/Consent`, `/FI/fetch`, ...) are appended.
    pub base_url: Url,
    /// Bearer token for the `Authorization` header.
    pub bearer_token: Zeroizing<String>,
    /// Detached JWS sent as `x-jws-signature`.
    pub jws_signature: Zeroizing<String>,
    /// `x-request-meta` for the consent-handle flow.
    pub request_meta_default: String,
    /// `x-request-meta` for the AA-protocol flow (signature and FI calls).
    pub request_meta_aa: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for AaApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AaApiConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &"[REDACTED]")
            .field("jws_signature", &"[REDACTED]")
            .field("request_meta_default", &self.request_meta_default)
            .field("request_meta_aa", &self.request_meta_aa)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AaApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `AA_BASE_URL` (default: `https://api.sandbox.sahamati.org.in/proxy/v2`)
    /// - `AA_BEARER_TOKEN` (required)
    /// - `AA_JWS_SIGNATURE` (required)
    /// - `AA_REQUEST_META` (required)
    /// - `AA_REQUEST_META_AA` (default: value of `AA_REQUEST_META`)
    /// - `AA_TIMEOUT_SECS` (default: 30; must be a positive integer)
    pub fn from_env() -> Result<Self, ConfigError> {
        let request_meta_default = required("AA_REQUEST_META")?;
        let request_meta_aa =
            std::env::var("AA_REQUEST_META_AA").unwrap_or_else(|_| request_meta_default.clone());

        Ok(Self {
            base_url: env_url("AA_BASE_URL", DEFAULT_BASE_URL)?,
            bearer_token: Zeroizing::new(required("AA_BEARER_TOKEN")?),
            jws_signature: Zeroizing::new(required("AA_JWS_SIGNATURE")?),
            request_meta_default,
            request_meta_aa,
            timeout_secs: env_timeout("AA_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Create a configuration pointing to a local mock server (for testing).
    pub fn local_mock(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?,
            bearer_token: Zeroizing::new(token.to_string()),
            jws_signature: Zeroizing::new("test-signature".to_string()),
            request_meta_default: "meta-default".to_string(),
            request_meta_aa: "meta-aa".to_string(),
            timeout_secs: 5,
        })
    }

    /// Full URL for an endpoint path such as `Consent/handle`.
    pub(crate) fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn required(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(var.to_string())),
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_timeout(var: &str, default: u64) -> Result<u64, ConfigError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidTimeout(var.to_string(), raw)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{0} contains characters not allowed in an HTTP header")]
    InvalidHeader(&'static str),
    #[error("{0} must be a positive number of seconds, got {1:?}")]
    InvalidTimeout(String, String),
}
