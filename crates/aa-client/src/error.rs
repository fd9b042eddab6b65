//! AA API client error types.

use aa_crypto::CryptoError;

/// Errors from AA API calls and the consent flow around them.
#[derive(Debug, thiserror::Error)]
pub enum AaApiError {
    /// HTTP transport error (connection refused, timeout, TLS).
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The AA API answered with a status the operation does not accept.
    /// `body` is the raw response text, unmodified.
    #[error("AA API {endpoint} returned {status}: {body}")]
    Upstream {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// A 2xx response lacked a field the operation needs.
    #[error("response from {endpoint} is missing {field}")]
    MissingField {
        endpoint: String,
        field: &'static str,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
    /// Key material could not be produced.
    #[error("key material unavailable: {0}")]
    KeyMaterial(#[from] CryptoError),
    /// No FI session is held for the transaction.
    #[error("no FI session for transaction {0}")]
    SessionNotFound(String),
    /// A session exists for the transaction but under another session id.
    #[error("transaction {txn_id} has no session {session_id}")]
    SessionMismatch { txn_id: String, session_id: String },
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Non-success status, network failure, or unusable upstream body.
    Upstream,
    /// Missing or malformed configuration or key material.
    Config,
    /// Session lookup miss.
    NotFound,
}

impl AaApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http { .. }
            | Self::Upstream { .. }
            | Self::Deserialization { .. }
            | Self::MissingField { .. } => ErrorKind::Upstream,
            Self::Config(_) | Self::KeyMaterial(_) => ErrorKind::Config,
            Self::SessionNotFound(_) | Self::SessionMismatch { .. } => ErrorKind::NotFound,
        }
    }

    /// Upstream status code, when the AA API answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw upstream body, when the AA API answered with an error status.
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            Self::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }
}
