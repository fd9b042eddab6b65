//! Typed client for the Account Aggregator consent and FI APIs.
//!
//! ## Endpoints
//!
//! | Method | Path | Operation | `x-request-meta` |
//! |--------|------|-----------|------------------|
//! | POST | `/Consent` | [`AaClient::create_consent`] | default |
//! | POST | `/Consent/handle` | [`AaClient::resolve_consent_id`] | default |
//! | POST | `/Consent/fetch` | [`AaClient::fetch_signature`] | AA |
//! | POST | `/FI/request` | [`AaClient::request_fi_data`] | AA |
//! | POST | `/FI/fetch` | [`AaClient::fetch_fi_data`] | AA |
//!
//! Every request carries `Authorization: Bearer <token>`, `x-jws-signature`
//! and `x-request-meta`. There is no retry: a failed call is returned to the
//! caller as-is.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use aa_crypto::KeyMaterial;

use crate::config::{AaApiConfig, ConfigError};
use crate::consent::ConsentDocument;
use crate::error::AaApiError;
use crate::types::{
    ConsentFetchBody, ConsentHandle, ConsentHandleBody, ConsentHandleResponse, ConsentStatus,
    CreateConsentResponse, Envelope, FiConsentRef, FiDataRange, FiFetchBody, FiFetchResponse,
    FiRequestBody, FiRequestResponse, LinkRef, SignedConsent,
};

const JWS_SIGNATURE: HeaderName = HeaderName::from_static("x-jws-signature");
const REQUEST_META: HeaderName = HeaderName::from_static("x-request-meta");

/// Which configured `x-request-meta` value a call sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMeta {
    /// Consent-handle flow (`/Consent`, `/Consent/handle`).
    Default,
    /// AA-protocol flow (`/Consent/fetch`, `/FI/*`).
    Aa,
}

/// What status codes an operation treats as success.
#[derive(Debug, Clone, Copy)]
enum Accept {
    AnySuccess,
    OkOnly,
}

/// Client for the AA API. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct AaClient {
    http: reqwest::Client,
    config: AaApiConfig,
    meta_default: HeaderValue,
    meta_aa: HeaderValue,
}

impl AaClient {
    /// Create a client from configuration.
    ///
    /// Bearer token and signature are installed as default headers, marked
    /// sensitive so they are never printed by the transport.
    pub fn new(config: AaApiConfig) -> Result<Self, AaApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            sensitive(&format!("Bearer {}", config.bearer_token.as_str()), "bearer token")?,
        );
        headers.insert(
            JWS_SIGNATURE,
            sensitive(config.jws_signature.as_str(), "JWS signature")?,
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AaApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let meta_default = HeaderValue::from_str(&config.request_meta_default)
            .map_err(|_| ConfigError::InvalidHeader("request meta (default)"))?;
        let meta_aa = HeaderValue::from_str(&config.request_meta_aa)
            .map_err(|_| ConfigError::InvalidHeader("request meta (AA)"))?;

        Ok(Self {
            http,
            config,
            meta_default,
            meta_aa,
        })
    }

    pub fn config(&self) -> &AaApiConfig {
        &self.config
    }

    /// Submit a consent request.
    ///
    /// Calls `POST {base_url}/Consent` and returns the `ConsentHandle`.
    pub async fn create_consent(&self, doc: &ConsentDocument) -> Result<ConsentHandle, AaApiError> {
        let endpoint = "POST /Consent";
        let resp: CreateConsentResponse = self
            .post(endpoint, "Consent", &doc.txnid, RequestMeta::Default, Accept::AnySuccess, doc)
            .await?;
        resp.consent_handle
            .filter(|h| !h.is_empty())
            .map(ConsentHandle)
            .ok_or(AaApiError::MissingField {
                endpoint: endpoint.into(),
                field: "ConsentHandle",
            })
    }

    /// Look up the consent id and status behind a handle.
    ///
    /// Calls `POST {base_url}/Consent/handle`. Safe to repeat; the caller
    /// polls until the status is `ACTIVE`.
    pub async fn resolve_consent_id(
        &self,
        txn_id: &str,
        handle: &ConsentHandle,
    ) -> Result<ConsentStatus, AaApiError> {
        let endpoint = "POST /Consent/handle";
        let body = Envelope::new(
            txn_id,
            ConsentHandleBody {
                consent_handle: handle.as_str(),
            },
        );
        let resp: ConsentHandleResponse = self
            .post(endpoint, "Consent/handle", txn_id, RequestMeta::Default, Accept::AnySuccess, &body)
            .await?;
        let raw = resp.consent_status.ok_or(AaApiError::MissingField {
            endpoint: endpoint.into(),
            field: "ConsentStatus",
        })?;
        Ok(ConsentStatus {
            consent_id: raw.id.filter(|id| !id.is_empty()),
            status: raw.status,
        })
    }

    /// Fetch the signed consent artefact.
    ///
    /// Calls `POST {base_url}/Consent/fetch`.
    pub async fn fetch_signature(
        &self,
        txn_id: &str,
        consent_id: &str,
    ) -> Result<SignedConsent, AaApiError> {
        let endpoint = "POST /Consent/fetch";
        let body = Envelope::new(txn_id, ConsentFetchBody { consent_id });
        let signed: SignedConsent = self
            .post(endpoint, "Consent/fetch", txn_id, RequestMeta::Aa, Accept::AnySuccess, &body)
            .await?;
        if signed.signed_consent.is_empty() {
            return Err(AaApiError::MissingField {
                endpoint: endpoint.into(),
                field: "signedConsent",
            });
        }
        Ok(signed)
    }

    /// Request FI data for an active consent. Returns the session id.
    ///
    /// Calls `POST {base_url}/FI/request`.
    pub async fn request_fi_data(
        &self,
        txn_id: &str,
        consent_id: &str,
        signature: &str,
        key_material: &KeyMaterial,
        window: &FiDataRange,
    ) -> Result<String, AaApiError> {
        let endpoint = "POST /FI/request";
        let body = Envelope::new(
            txn_id,
            FiRequestBody {
                fi_data_range: window,
                consent: FiConsentRef {
                    id: consent_id,
                    digital_signature: signature,
                },
                key_material,
            },
        );
        let resp: FiRequestResponse = self
            .post(endpoint, "FI/request", txn_id, RequestMeta::Aa, Accept::AnySuccess, &body)
            .await?;
        resp.session_id
            .filter(|s| !s.is_empty())
            .ok_or(AaApiError::MissingField {
                endpoint: endpoint.into(),
                field: "sessionId",
            })
    }

    /// Fetch the encrypted FI payload for a session.
    ///
    /// Calls `POST {base_url}/FI/fetch`. Only `200 OK` is accepted; any
    /// other status is returned as [`AaApiError::Upstream`].
    pub async fn fetch_fi_data(
        &self,
        txn_id: &str,
        session_id: &str,
        fip_id: &str,
        link_ref_numbers: &[String],
    ) -> Result<FiFetchResponse, AaApiError> {
        let endpoint = "POST /FI/fetch";
        let body = Envelope::new(
            txn_id,
            FiFetchBody {
                session_id,
                fip_id,
                link_ref_number: link_ref_numbers
                    .iter()
                    .map(|id| LinkRef { id: id.as_str() })
                    .collect(),
            },
        );
        self.post(endpoint, "FI/fetch", txn_id, RequestMeta::Aa, Accept::OkOnly, &body)
            .await
    }

    async fn post<B, R>(
        &self,
        endpoint: &str,
        path: &str,
        txn_id: &str,
        meta: RequestMeta,
        accept: Accept,
        body: &B,
    ) -> Result<R, AaApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint_url(path);
        let meta_value = match meta {
            RequestMeta::Default => self.meta_default.clone(),
            RequestMeta::Aa => self.meta_aa.clone(),
        };

        tracing::debug!(endpoint, txn_id, ?meta, "calling AA API");

        let resp = self
            .http
            .post(&url)
            .header(REQUEST_META, meta_value)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(endpoint, txn_id, error = %e, "AA API transport failure");
                AaApiError::Http {
                    endpoint: endpoint.into(),
                    source: e,
                }
            })?;

        let status = resp.status();
        let accepted = match accept {
            Accept::AnySuccess => status.is_success(),
            Accept::OkOnly => status == StatusCode::OK,
        };
        if !accepted {
            let body = resp.text().await.map_err(|e| {
                tracing::warn!(
                    endpoint,
                    txn_id,
                    status = status.as_u16(),
                    error = %e,
                    "failed to read AA API error body"
                );
                AaApiError::Http {
                    endpoint: endpoint.into(),
                    source: e,
                }
            })?;
            tracing::warn!(endpoint, txn_id, status = status.as_u16(), "AA API rejected request");
            return Err(AaApiError::Upstream {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(endpoint, txn_id, status = status.as_u16(), "AA API call succeeded");

        resp.json().await.map_err(|e| AaApiError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }
}

fn sensitive(value: &str, what: &'static str) -> Result<HeaderValue, ConfigError> {
    let mut v = HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader(what))?;
    v.set_sensitive(true);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_header_unsafe_token() {
        let mut cfg = AaApiConfig::local_mock("http://127.0.0.1:9000", "t").unwrap();
        cfg.bearer_token = zeroize::Zeroizing::new("bad\ntoken".into());
        let err = AaClient::new(cfg).unwrap_err();
        assert!(matches!(
            err,
            AaApiError::Config(ConfigError::InvalidHeader("bearer token"))
        ));
    }

    #[test]
    fn rejects_header_unsafe_meta() {
        let mut cfg = AaApiConfig::local_mock("http://127.0.0.1:9000", "t").unwrap();
        cfg.request_meta_aa = "line\rbreak".into();
        assert!(matches!(
            AaClient::new(cfg),
            Err(AaApiError::Config(ConfigError::InvalidHeader(_)))
        ));
    }

    #[test]
    fn debug_does_not_leak_token() {
        let cfg = AaApiConfig::local_mock("http://127.0.0.1:9000", "very-secret-token").unwrap();
        let client = AaClient::new(cfg).unwrap();
        assert!(!format!("{client:?}").contains("very-secret-token"));
    }
}
