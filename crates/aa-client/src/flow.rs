//! FI request/fetch orchestration.
//!
//! Ties the key-material provider and the session store to the two FI
//! calls so that the private key for a session is produced, held, and
//! discarded in one place:
//!
//! 1. [`ConsentFlow::request_fi_data`] draws fresh key material, sends its
//!    public half with `POST /FI/request`, and stores the private key under
//!    the transaction id together with the returned session id.
//! 2. [`ConsentFlow::fetch_fi_data`] looks the session up, calls
//!    `POST /FI/fetch`, and on success takes the session out of the store
//!    and hands it to the caller. A failed fetch leaves the session in
//!    place so the fetch can be repeated.

use std::sync::Arc;

use aa_crypto::KeyMaterialProvider;

use crate::client::AaClient;
use crate::error::AaApiError;
use crate::session::{Session, SessionStore};
use crate::types::{FiDataRange, FiFetchResponse};

/// FI payload together with the session that decrypts it.
#[derive(Debug)]
pub struct FetchedFi {
    pub payload: FiFetchResponse,
    /// Already removed from the store. Dropping it zeroizes the key.
    pub session: Session,
}

/// Consent-to-fetch orchestration over one [`AaClient`].
#[derive(Clone)]
pub struct ConsentFlow {
    client: AaClient,
    keys: Arc<dyn KeyMaterialProvider>,
    sessions: SessionStore,
}

impl std::fmt::Debug for ConsentFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentFlow")
            .field("client", &self.client)
            .field("keys", &self.keys.provider_name())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl ConsentFlow {
    pub fn new(
        client: AaClient,
        keys: Arc<dyn KeyMaterialProvider>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            client,
            keys,
            sessions,
        }
    }

    pub fn client(&self) -> &AaClient {
        &self.client
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Generate key material, request FI data, and remember the session.
    /// Returns the upstream session id.
    pub async fn request_fi_data(
        &self,
        txn_id: &str,
        consent_id: &str,
        signature: &str,
        window: &FiDataRange,
    ) -> Result<String, AaApiError> {
        let keys = self.keys.generate().map_err(|e| {
            tracing::error!(
                txn_id,
                provider = self.keys.provider_name(),
                error = %e,
                "key material unavailable"
            );
            AaApiError::KeyMaterial(e)
        })?;

        let session_id = self
            .client
            .request_fi_data(txn_id, consent_id, signature, &keys.material, window)
            .await?;

        self.sessions.put(
            txn_id,
            Session {
                txn_id: txn_id.to_string(),
                session_id: session_id.clone(),
                private_key: keys.private_key,
                created_at: keys.issued_at,
            },
        );
        tracing::info!(txn_id, session_id = %session_id, "FI session opened");
        Ok(session_id)
    }

    /// Fetch FI data for the transaction's stored session.
    ///
    /// If `session_id` is given it must match the stored session.
    pub async fn fetch_fi_data(
        &self,
        txn_id: &str,
        session_id: Option<&str>,
        fip_id: &str,
        link_ref_numbers: &[String],
    ) -> Result<FetchedFi, AaApiError> {
        let stored = self.sessions.get(txn_id)?;
        if let Some(requested) = session_id {
            if requested != stored.session_id {
                return Err(AaApiError::SessionMismatch {
                    txn_id: txn_id.to_string(),
                    session_id: requested.to_string(),
                });
            }
        }

        let payload = self
            .client
            .fetch_fi_data(txn_id, &stored.session_id, fip_id, link_ref_numbers)
            .await?;

        // A concurrent FI request may have replaced the entry; leave a newer
        // session in place.
        let session = self
            .sessions
            .remove_if_session(txn_id, &stored.session_id)
            .unwrap_or(stored);
        tracing::info!(txn_id, records = payload.fi.len(), "FI session consumed");
        Ok(FetchedFi { payload, session })
    }
}
