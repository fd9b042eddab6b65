//! # KeyMaterial Wire Type
//!
//! The `KeyMaterial` block sent with an FI request. Field casing follows the
//! ReBIT AA API (`DHPublicKey.Parameters`, `DHPublicKey.KeyValue`,
//! `Nonce`); lower-camel aliases are accepted on input so that payloads
//! produced by other clients still parse.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::x25519::{PrivateKey, PublicKey};

/// Key agreement algorithm tag.
pub const CRYPTO_ALG: &str = "ECDH";

/// Curve name as the AA API spells it.
pub const CURVE: &str = "Curve25519";

/// Cipher and key-pair generator hints sent alongside the public key.
pub const DEFAULT_PARAMS: &str = "cipher=AES/GCM/NoPadding;KeyPairGenerator=ECDH";

/// Lifetime of a published public key.
pub const KEY_EXPIRY_MINUTES: i64 = 30;

/// Nonce length in bytes before base64.
pub const NONCE_LEN: usize = 32;

/// Current time at the millisecond precision the expiry is rendered with.
pub fn issue_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Public half of the Diffie-Hellman exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhPublicKey {
    pub expiry: String,
    #[serde(rename = "Parameters", alias = "parameters")]
    pub parameters: String,
    #[serde(rename = "KeyValue", alias = "keyValue")]
    pub key_value: String,
}

/// The `KeyMaterial` object of an FI request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    #[serde(rename = "cryptoAlg")]
    pub crypto_alg: String,
    pub curve: String,
    pub params: String,
    #[serde(rename = "DHPublicKey")]
    pub dh_public_key: DhPublicKey,
    #[serde(rename = "Nonce", alias = "nonce")]
    pub nonce: String,
}

impl KeyMaterial {
    /// Assemble key material for `public_key`, expiring
    /// [`KEY_EXPIRY_MINUTES`] after `issued_at`. Sub-millisecond digits of
    /// `issued_at` are dropped.
    pub fn new(
        public_key: &PublicKey,
        parameters: &str,
        nonce: String,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expiry = issued_at.trunc_subsecs(3) + Duration::minutes(KEY_EXPIRY_MINUTES);
        Self {
            crypto_alg: CRYPTO_ALG.to_string(),
            curve: CURVE.to_string(),
            params: DEFAULT_PARAMS.to_string(),
            dh_public_key: DhPublicKey {
                expiry: expiry.to_rfc3339_opts(SecondsFormat::Millis, true),
                parameters: parameters.to_string(),
                key_value: public_key.to_base64(),
            },
            nonce,
        }
    }

    /// Parse the `DHPublicKey.expiry` timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.dh_public_key.expiry)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Decode the published public key.
    pub fn public_key(&self) -> Result<PublicKey, crate::CryptoError> {
        PublicKey::from_base64(&self.dh_public_key.key_value)
    }
}

/// Key material paired with the private key that must stay in-process.
///
/// Not `Serialize`: only [`EphemeralKeys::material`] goes on the wire.
#[derive(Debug, Clone)]
pub struct EphemeralKeys {
    pub material: KeyMaterial,
    pub private_key: PrivateKey,
    pub issued_at: DateTime<Utc>,
}
