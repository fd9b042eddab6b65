//! # Key Material Providers
//!
//! Produces the `KeyMaterial` sent with an FI request together with the
//! private key that decrypts the eventual FI payload. Two policies:
//!
//! - [`FreshKeyProvider`]: a new X25519 key pair per call. The private key
//!   exists only in memory.
//! - [`FixedKeyProvider`]: a key pair loaded once from a
//!   [`FixedKeyDescriptor`] on disk. Each call reuses the pair and draws a
//!   fresh nonce and expiry.
//!
//! The policy is chosen at start-up from [`KeyPolicy`].
//!
//! ## Security Invariants
//!
//! - Providers never log key bytes. Only the provider name and the
//!   descriptor path appear in diagnostics.
//! - `KeyMaterialProvider` is `Send + Sync` for use across async tasks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::key_material::{issue_time, EphemeralKeys, KeyMaterial, NONCE_LEN};
use crate::x25519::{random_base64, PrivateKey, PublicKey};

/// Source of per-session key material.
pub trait KeyMaterialProvider: Send + Sync {
    /// Produce key material and its private key.
    fn generate(&self) -> Result<EphemeralKeys, CryptoError>;

    /// Human-readable name for this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;
}

// ─── FreshKeyProvider ────────────────────────────────────────────────────

/// Generates a new X25519 key pair on every call.
#[derive(Debug, Default, Clone)]
pub struct FreshKeyProvider {
    parameters: String,
}

impl FreshKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `DHPublicKey.Parameters` string (empty by default).
    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }
}

impl KeyMaterialProvider for FreshKeyProvider {
    fn generate(&self) -> Result<EphemeralKeys, CryptoError> {
        let private_key = PrivateKey::generate();
        let issued_at = issue_time();
        let material = KeyMaterial::new(
            &private_key.public_key(),
            &self.parameters,
            random_base64(NONCE_LEN),
            issued_at,
        );
        Ok(EphemeralKeys {
            material,
            private_key,
            issued_at,
        })
    }

    fn provider_name(&self) -> &str {
        "FreshKeyProvider"
    }
}

// ─── FixedKeyProvider ────────────────────────────────────────────────────

/// On-disk descriptor of a previously generated key pair.
///
/// ```json
/// { "publicKey": "<base64>", "privateKey": "<base64>", "parameters": "" }
/// ```
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedKeyDescriptor {
    pub public_key: String,
    pub private_key: Zeroizing<String>,
    #[serde(default)]
    pub parameters: String,
}

impl std::fmt::Debug for FixedKeyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedKeyDescriptor")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl FixedKeyDescriptor {
    /// Generate a new key pair and wrap it in a descriptor.
    pub fn generate() -> Self {
        let sk = PrivateKey::generate();
        Self {
            public_key: sk.public_key().to_base64(),
            private_key: sk.to_base64(),
            parameters: String::new(),
        }
    }

    /// Write the descriptor as JSON. The file holds a private key; callers
    /// are responsible for its permissions.
    pub fn write_to(&self, path: &Path) -> Result<(), CryptoError> {
        let write_err = |reason: String| CryptoError::Write {
            path: path.display().to_string(),
            reason,
        };
        let json = Zeroizing::new(
            serde_json::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?,
        );
        std::fs::write(path, json.as_bytes()).map_err(|e| write_err(e.to_string()))
    }
}

/// Serves a stored key pair with a fresh nonce and expiry per call.
pub struct FixedKeyProvider {
    private_key: PrivateKey,
    public_key: PublicKey,
    parameters: String,
    source: String,
}

impl FixedKeyProvider {
    /// Load and validate a descriptor file.
    ///
    /// Fails with [`CryptoError::MissingKeySource`] if the file cannot be
    /// read, [`CryptoError::MalformedKeySource`] if it does not parse, and
    /// [`CryptoError::KeyMismatch`] if the public key is not derived from
    /// the private key.
    pub fn load(path: &Path) -> Result<Self, CryptoError> {
        let source = path.display().to_string();
        let raw = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            CryptoError::MissingKeySource {
                path: source.clone(),
                reason: e.to_string(),
            }
        })?);
        Self::from_json(&raw, &source)
    }

    /// Parse a descriptor from a JSON string. `source` names the origin in
    /// error messages.
    pub fn from_json(json: &str, source: &str) -> Result<Self, CryptoError> {
        let malformed = |reason: String| CryptoError::MalformedKeySource {
            path: source.to_string(),
            reason,
        };
        let descriptor: FixedKeyDescriptor =
            serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
        Self::from_descriptor(descriptor, source)
    }

    pub fn from_descriptor(
        descriptor: FixedKeyDescriptor,
        source: &str,
    ) -> Result<Self, CryptoError> {
        let malformed = |e: CryptoError| CryptoError::MalformedKeySource {
            path: source.to_string(),
            reason: e.to_string(),
        };
        let private_key = PrivateKey::from_base64(&descriptor.private_key).map_err(malformed)?;
        let public_key = PublicKey::from_base64(&descriptor.public_key).map_err(malformed)?;
        if private_key.public_key() != public_key {
            return Err(CryptoError::KeyMismatch(source.to_string()));
        }
        tracing::info!(source, "loaded fixed key descriptor");
        Ok(Self {
            private_key,
            public_key,
            parameters: descriptor.parameters,
            source: source.to_string(),
        })
    }

    /// Where the key pair was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for FixedKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedKeyProvider")
            .field("public_key", &self.public_key)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl KeyMaterialProvider for FixedKeyProvider {
    fn generate(&self) -> Result<EphemeralKeys, CryptoError> {
        let issued_at = issue_time();
        let material = KeyMaterial::new(
            &self.public_key,
            &self.parameters,
            random_base64(NONCE_LEN),
            issued_at,
        );
        Ok(EphemeralKeys {
            material,
            private_key: self.private_key.clone(),
            issued_at,
        })
    }

    fn provider_name(&self) -> &str {
        "FixedKeyProvider"
    }
}

// ─── Policy selection ────────────────────────────────────────────────────

/// Which provider to run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPolicy {
    GenerateFresh,
    LoadFixed { path: PathBuf },
}

impl KeyPolicy {
    /// Read the policy from the environment.
    ///
    /// - `AA_KEY_POLICY`: `fresh` (default) or `fixed`
    /// - `AA_FIXED_KEY_PATH`: descriptor path, required for `fixed`
    pub fn from_env() -> Result<Self, CryptoError> {
        let name = std::env::var("AA_KEY_POLICY").unwrap_or_else(|_| "fresh".to_string());
        let path = std::env::var("AA_FIXED_KEY_PATH").ok();
        Self::parse(&name, path.as_deref())
    }

    pub fn parse(name: &str, fixed_path: Option<&str>) -> Result<Self, CryptoError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fresh" | "generate-fresh" => Ok(Self::GenerateFresh),
            "fixed" | "load-fixed" => match fixed_path {
                Some(p) if !p.trim().is_empty() => Ok(Self::LoadFixed {
                    path: PathBuf::from(p),
                }),
                _ => Err(CryptoError::MissingKeySource {
                    path: "AA_FIXED_KEY_PATH".to_string(),
                    reason: "not set".to_string(),
                }),
            },
            other => Err(CryptoError::UnknownPolicy(other.to_string())),
        }
    }

    /// Build the provider for this policy. Loading happens here, so a bad
    /// descriptor fails at start-up rather than on the first FI request.
    pub fn into_provider(self) -> Result<Box<dyn KeyMaterialProvider>, CryptoError> {
        match self {
            Self::GenerateFresh => Ok(Box::new(FreshKeyProvider::new())),
            Self::LoadFixed { path } => Ok(Box::new(FixedKeyProvider::load(&path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    #[test]
    fn fresh_provider_public_key_is_32_bytes() {
        let keys = FreshKeyProvider::new().generate().unwrap();
        let raw = STANDARD
            .decode(&keys.material.dh_public_key.key_value)
            .unwrap();
        assert_eq!(raw.len(), crate::x25519::PUBLIC_KEY_LEN);
    }

    #[test]
    fn fresh_provider_expiry_is_thirty_minutes_after_issue() {
        for _ in 0..16 {
            let keys = FreshKeyProvider::new().generate().unwrap();
            let expiry = keys.material.expires_at().unwrap();
            assert_eq!(
                expiry - keys.issued_at,
                chrono::Duration::minutes(30),
                "expiry must be exactly 30 minutes after issue"
            );
        }
    }

    #[test]
    fn fresh_provider_pairs_private_and_public() {
        let keys = FreshKeyProvider::new().generate().unwrap();
        assert_eq!(
            keys.material.public_key().unwrap(),
            keys.private_key.public_key()
        );
    }

    #[test]
    fn fresh_provider_never_repeats_keys_or_nonces() {
        let p = FreshKeyProvider::new();
        let a = p.generate().unwrap();
        let b = p.generate().unwrap();
        assert_ne!(a.private_key, b.private_key);
        assert_ne!(a.material.dh_public_key.key_value, b.material.dh_public_key.key_value);
        assert_ne!(a.material.nonce, b.material.nonce);
    }

    #[test]
    fn fixed_provider_reuses_key_with_fresh_nonce() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let descriptor = FixedKeyDescriptor::generate();
        descriptor.write_to(&path).unwrap();

        let p = FixedKeyProvider::load(&path).unwrap();
        let a = p.generate().unwrap();
        let b = p.generate().unwrap();
        assert_eq!(a.material.dh_public_key.key_value, descriptor.public_key);
        assert_eq!(a.material.dh_public_key.key_value, b.material.dh_public_key.key_value);
        assert_eq!(a.private_key, b.private_key);
        assert_ne!(a.material.nonce, b.material.nonce);
    }

    #[test]
    fn fixed_provider_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FixedKeyProvider::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CryptoError::MissingKeySource { .. }));
    }

    #[test]
    fn fixed_provider_malformed_json() {
        let err = FixedKeyProvider::from_json("{not json", "inline").unwrap_err();
        assert!(matches!(err, CryptoError::MalformedKeySource { .. }));
    }

    #[test]
    fn fixed_provider_bad_key_bytes() {
        let json = r#"{"publicKey":"AAAA","privateKey":"AAAA"}"#;
        let err = FixedKeyProvider::from_json(json, "inline").unwrap_err();
        assert!(matches!(err, CryptoError::MalformedKeySource { .. }));
    }

    #[test]
    fn fixed_provider_rejects_mismatched_pair() {
        let a = FixedKeyDescriptor::generate();
        let b = FixedKeyDescriptor::generate();
        let mixed = FixedKeyDescriptor {
            public_key: b.public_key.clone(),
            private_key: a.private_key.clone(),
            parameters: String::new(),
        };
        let err = FixedKeyProvider::from_descriptor(mixed, "inline").unwrap_err();
        assert!(matches!(err, CryptoError::KeyMismatch(_)));
    }

    #[test]
    fn descriptor_debug_redacts_private_key() {
        let d = FixedKeyDescriptor::generate();
        let rendered = format!("{d:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(d.private_key.as_str()));
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(KeyPolicy::parse("fresh", None).unwrap(), KeyPolicy::GenerateFresh);
        assert_eq!(
            KeyPolicy::parse("FIXED", Some("/etc/aa/keys.json")).unwrap(),
            KeyPolicy::LoadFixed {
                path: PathBuf::from("/etc/aa/keys.json")
            }
        );
        assert!(matches!(
            KeyPolicy::parse("fixed", None),
            Err(CryptoError::MissingKeySource { .. })
        ));
        assert!(matches!(
            KeyPolicy::parse("rotating", None),
            Err(CryptoError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn policy_builds_provider() {
        let provider = KeyPolicy::GenerateFresh.into_provider().unwrap();
        assert_eq!(provider.provider_name(), "FreshKeyProvider");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        FixedKeyDescriptor::generate().write_to(&path).unwrap();
        let provider = KeyPolicy::LoadFixed { path }.into_provider().unwrap();
        assert_eq!(provider.provider_name(), "FixedKeyProvider");
    }
}
