//! Key-material error types.

/// Errors raised while producing or loading key material.
///
/// Callers treat every variant as a configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The fixed key descriptor could not be read.
    #[error("fixed key source {path} is missing: {reason}")]
    MissingKeySource { path: String, reason: String },

    /// The fixed key descriptor exists but does not parse.
    #[error("fixed key source {path} is malformed: {reason}")]
    MalformedKeySource { path: String, reason: String },

    /// Key bytes have the wrong length or encoding.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The stored public key is not derived from the stored private key.
    #[error("public key in {0} does not match its private key")]
    KeyMismatch(String),

    /// The configured key policy name is not recognised.
    #[error("unknown key policy {0:?} (expected \"fresh\" or \"fixed\")")]
    UnknownPolicy(String),

    /// Writing a descriptor to disk failed.
    #[error("failed to write key descriptor to {path}: {reason}")]
    Write { path: String, reason: String },
}
