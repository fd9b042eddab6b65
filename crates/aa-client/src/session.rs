//! In-memory store of FI sessions, keyed by transaction id.
//!
//! A session is created when `POST /FI/request` succeeds and holds the
//! private key whose public half was sent upstream. It is taken out of the
//! store when the matching `POST /FI/fetch` succeeds.
//!
//! Storage is a `DashMap`: operations on different transactions never
//! contend on the same lock, and there is no ordering between them.
//!
//! TODO: sessions abandoned before FI fetch are never removed. Evict
//! entries once their key material has expired (`KEY_EXPIRY_MINUTES`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use aa_crypto::PrivateKey;

use crate::error::AaApiError;

/// State carried from FI request to FI fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub txn_id: String,
    pub session_id: String,
    pub private_key: PrivateKey,
    pub created_at: DateTime<Utc>,
}

/// Shared session store. Cheaply cloneable via `Arc`; all clones share the
/// same data.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<DashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `session` under `txn_id`, replacing any existing entry.
    pub fn put(&self, txn_id: &str, session: Session) {
        if self.inner.insert(txn_id.to_string(), session).is_some() {
            tracing::debug!(txn_id, "replaced existing FI session");
        }
    }

    /// Return a copy of the session for `txn_id`.
    pub fn get(&self, txn_id: &str) -> Result<Session, AaApiError> {
        self.inner
            .get(txn_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AaApiError::SessionNotFound(txn_id.to_string()))
    }

    /// Take the session out of the store. The private key is zeroized when
    /// the returned value is dropped.
    pub fn remove(&self, txn_id: &str) -> Option<Session> {
        self.inner.remove(txn_id).map(|(_, session)| session)
    }

    /// Take the session out only if it is still `session_id`.
    pub fn remove_if_session(&self, txn_id: &str, session_id: &str) -> Option<Session> {
        self.inner
            .remove_if(txn_id, |_, s| s.session_id == session_id)
            .map(|(_, session)| session)
    }

    pub fn contains(&self, txn_id: &str) -> bool {
        self.inner.contains_key(txn_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
