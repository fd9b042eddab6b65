//! # aa-client: Typed Rust client for the Account Aggregator APIs
//!
//! Drives the consent lifecycle against an AA (ReBIT API v2):
//!
//! ```text
//! ConsentPayloadBuilder ─► create_consent ─► resolve_consent_id (polled by caller)
//!     ─► fetch_signature ─► request_fi_data ─► fetch_fi_data
//! ```
//!
//! - [`consent`]: builds the `POST /Consent` document.
//! - [`AaClient`]: the five outbound calls, with auth headers.
//! - [`session`]: per-transaction FI sessions holding the private key.
//! - [`flow`]: key material + FI request + session bookkeeping.
//!
//! The transaction id minted by the builder threads through every call of
//! a flow. The AA owns consent state; this crate never infers it.

pub mod client;
pub mod config;
pub mod consent;
pub mod error;
pub mod flow;
pub mod session;
pub mod types;

pub use client::{AaClient, RequestMeta};
pub use config::{AaApiConfig, ConfigError};
pub use consent::{ConsentDocument, ConsentPayloadBuilder, ConsentPolicy, CustomerIdentifiers};
pub use error::{AaApiError, ErrorKind};
pub use flow::{ConsentFlow, FetchedFi};
pub use session::{Session, SessionStore};
pub use types::{
    ConsentHandle, ConsentState, ConsentStatus, FiDataRange, FiFetchResponse, FipKeyMaterial,
    SignedConsent,
};
