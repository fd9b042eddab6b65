//! # X25519 Key Pairs
//!
//! Curve25519 Diffie-Hellman keys for the FI-data encryption handshake.
//!
//! ## Security Invariants
//!
//! - [`PrivateKey`] does not implement `Serialize` and its `Debug` output
//!   is redacted. The raw scalar is only reachable through
//!   [`PrivateKey::to_base64`], used when writing a fixed key descriptor.
//! - Private key bytes are zeroized on drop.
//! - Equality on private keys is constant-time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use curve25519_dalek::montgomery::MontgomeryPoint;
use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Length of an X25519 public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of an X25519 private scalar in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// An X25519 public key (Montgomery u-coordinate).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Standard base64 of the raw 32 bytes, as carried in `KeyValue`.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        decode_32(encoded, "public key").map(Self)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

/// An X25519 private scalar held for the lifetime of one FI-data session.
#[derive(Clone)]
pub struct PrivateKey {
    bytes: Zeroizing<[u8; PRIVATE_KEY_LEN]>,
}

impl PrivateKey {
    /// Generate a new private key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; PRIVATE_KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = decode_32(encoded, "private key")?;
        Ok(Self::from_bytes(bytes))
    }

    /// Export the raw scalar. Only used to persist a fixed key descriptor.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(&self.bytes[..]))
    }

    /// Derive the matching public key (clamped scalar times the base point).
    pub fn public_key(&self) -> PublicKey {
        PublicKey(MontgomeryPoint::mul_base_clamped(*self.bytes).to_bytes())
    }

    /// Compute the shared secret with a peer's public key.
    pub fn diffie_hellman(&self, peer: &PublicKey) -> SharedSecret {
        let point = MontgomeryPoint(peer.0).mul_clamped(*self.bytes);
        SharedSecret(Zeroizing::new(point.to_bytes()))
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl Eq for PrivateKey {}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// Raw X25519 output. Feed it to a KDF before use as a symmetric key.
pub struct SharedSecret(Zeroizing<[u8; 32]>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// Fill `len` bytes from the OS CSPRNG and base64 them.
pub fn random_base64(len: usize) -> String {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    OsRng.fill_bytes(buf.as_mut_slice());
    STANDARD.encode(buf.as_slice())
}

fn decode_32(encoded: &str, what: &str) -> Result<[u8; 32], CryptoError> {
    let raw = Zeroizing::new(
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("{what} is not valid base64: {e}")))?,
    );
    raw.as_slice().try_into().map_err(|_| {
        CryptoError::InvalidKey(format!("{what} must be 32 bytes, got {}", raw.len()))
    })
}
