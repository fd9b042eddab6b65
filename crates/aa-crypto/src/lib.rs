//! # aa-crypto: Key Material for the FI-Data Handshake
//!
//! Provides the cryptographic pieces an FI request needs:
//!
//! - **X25519** key pairs and ECDH shared secrets ([`x25519`]).
//! - The **`KeyMaterial`** wire block with ReBIT field casing
//!   ([`key_material`]).
//! - **Key material providers** behind a trait, with a generate-fresh and
//!   a load-fixed policy ([`key_provider`]).
//!
//! ## Crate Policy
//!
//! - Private keys are never serialized, logged, or sent upstream.
//! - No mocking of cryptographic operations in tests.

pub mod error;
pub mod key_material;
pub mod key_provider;
pub mod x25519;

pub use error::CryptoError;
pub use key_material::{DhPublicKey, EphemeralKeys, KeyMaterial};
pub use key_provider::{
    FixedKeyDescriptor, FixedKeyProvider, FreshKeyProvider, KeyMaterialProvider, KeyPolicy,
};
pub use x25519::{PrivateKey, PublicKey, SharedSecret};
