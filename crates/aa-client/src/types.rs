//! Request and response types for the AA consent and FI endpoints.
//!
//! Field names follow the ReBIT AA API v2 (mixed `camelCase` and
//! `PascalCase`). Response types are lenient: unknown fields are ignored
//! and optional fields default, so that additive changes upstream do not
//! break the client.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use aa_crypto::KeyMaterial;

/// Value of the `ver` field on every request.
pub const API_VERSION: &str = "2.0.0";

/// Common request envelope: `{ver, timestamp, txnid, ...body}`.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a, T: Serialize> {
    pub ver: &'static str,
    pub timestamp: String,
    pub txnid: &'a str,
    #[serde(flatten)]
    pub body: T,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub fn new(txnid: &'a str, body: T) -> Self {
        Self {
            ver: API_VERSION,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            txnid,
            body,
        }
    }
}

/// Time range of the financial data being requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiDataRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

// -- Consent ------------------------------------------------------------------

/// Opaque token for a pending consent, returned by `POST /Consent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentHandle(pub String);

impl ConsentHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConsentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Consent state as reported by the AA. Transitions are owned upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentState {
    Pending,
    Active,
    Rejected,
    Revoked,
    Expired,
    /// Forward-compatible catch-all (e.g. `PAUSED`).
    #[serde(other)]
    Unknown,
}

impl ConsentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Rejected => "REJECTED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Result of resolving a consent handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentStatus {
    /// Absent while the consent is still pending.
    pub consent_id: Option<String>,
    pub status: ConsentState,
}

/// `POST /Consent` response.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateConsentResponse {
    #[serde(rename = "ConsentHandle", alias = "consentHandle", default)]
    pub consent_handle: Option<String>,
}

/// `POST /Consent/handle` request body.
#[derive(Debug, Serialize)]
pub(crate) struct ConsentHandleBody<'a> {
    #[serde(rename = "ConsentHandle")]
    pub consent_handle: &'a str,
}

/// `POST /Consent/handle` response.
///
/// The status object has been seen as both `ConsentStatus` and
/// `consentStatus`; both spellings are accepted.
#[derive(Debug, Deserialize)]
pub(crate) struct ConsentHandleResponse {
    #[serde(rename = "ConsentStatus", alias = "consentStatus", default)]
    pub consent_status: Option<RawConsentStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawConsentStatus {
    #[serde(default)]
    pub id: Option<String>,
    pub status: ConsentState,
}

/// `POST /Consent/fetch` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConsentFetchBody<'a> {
    pub consent_id: &'a str,
}

/// Signed consent artefact from `POST /Consent/fetch`.
///
/// `signed_consent` is the detached-JWS blob; every other response field is
/// kept verbatim in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedConsent {
    pub consent_id: String,
    pub signed_consent: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

// -- FI -----------------------------------------------------------------------

/// `POST /FI/request` request body.
#[derive(Debug, Serialize)]
pub(crate) struct FiRequestBody<'a> {
    #[serde(rename = "FIDataRange")]
    pub fi_data_range: &'a FiDataRange,
    #[serde(rename = "Consent")]
    pub consent: FiConsentRef<'a>,
    #[serde(rename = "KeyMaterial")]
    pub key_material: &'a KeyMaterial,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FiConsentRef<'a> {
    pub id: &'a str,
    pub digital_signature: &'a str,
}

/// `POST /FI/request` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FiRequestResponse {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `POST /FI/fetch` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FiFetchBody<'a> {
    pub session_id: &'a str,
    pub fip_id: &'a str,
    pub link_ref_number: Vec<LinkRef<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LinkRef<'a> {
    pub id: &'a str,
}

/// Encrypted FI payload returned by `POST /FI/fetch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiFetchResponse {
    #[serde(default)]
    pub ver: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub txnid: Option<String>,
    #[serde(rename = "FI", default)]
    pub fi: Vec<FipData>,
}

impl FiFetchResponse {
    /// Encrypted records across all FIPs, keyed by link reference number.
    pub fn encrypted_by_link_ref(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fi
            .iter()
            .flat_map(|fip| fip.data.iter())
            .map(|d| (d.link_ref_number.as_str(), d.encrypted_fi.as_str()))
    }
}

/// Data released by one FIP, with the FIP's half of the key exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FipData {
    #[serde(rename = "fipID", alias = "fipId")]
    pub fip_id: String,
    #[serde(default)]
    pub data: Vec<EncryptedFi>,
    #[serde(rename = "KeyMaterial", default, skip_serializing_if = "Option::is_none")]
    pub key_material: Option<FipKeyMaterial>,
}

/// Key material as a FIP returns it. FIPs omit fields freely, so every
/// field is optional and absent fields stay absent when relayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FipKeyMaterial {
    #[serde(rename = "cryptoAlg", default, skip_serializing_if = "Option::is_none")]
    pub crypto_alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    #[serde(rename = "DHPublicKey", default, skip_serializing_if = "Option::is_none")]
    pub dh_public_key: Option<FipDhPublicKey>,
    #[serde(rename = "Nonce", alias = "nonce", default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FipDhPublicKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(
        rename = "Parameters",
        alias = "parameters",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parameters: Option<String>,
    #[serde(
        rename = "KeyValue",
        alias = "keyValue",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub key_value: Option<String>,
}

impl FipKeyMaterial {
    /// The FIP's base64 public key, when present.
    pub fn key_value(&self) -> Option<&str> {
        self.dh_public_key.as_ref()?.key_value.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedFi {
    pub link_ref_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masked_acc_number: Option<String>,
    #[serde(rename = "encryptedFI")]
    pub encrypted_fi: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_flattens_body() {
        let json = serde_json::to_value(Envelope::new(
            "txn-1",
            ConsentHandleBody {
                consent_handle: "h-1",
            },
        ))
        .unwrap();
        assert_eq!(json["ver"], "2.0.0");
        assert_eq!(json["txnid"], "txn-1");
        assert_eq!(json["ConsentHandle"], "h-1");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn handle_response_accepts_both_casings() {
        let upper: ConsentHandleResponse = serde_json::from_str(
            r#"{"ConsentHandle":"h","ConsentStatus":{"id":"c-1","status":"ACTIVE"}}"#,
        )
        .unwrap();
        let lower: ConsentHandleResponse = serde_json::from_str(
            r#"{"ConsentHandle":"h","consentStatus":{"id":"c-1","status":"ACTIVE"}}"#,
        )
        .unwrap();
        for r in [upper, lower] {
            let s = r.consent_status.unwrap();
            assert_eq!(s.id.as_deref(), Some("c-1"));
            assert_eq!(s.status, ConsentState::Active);
        }
    }

    #[test]
    fn unknown_consent_state_is_tolerated() {
        let s: RawConsentStatus =
            serde_json::from_str(r#"{"id":null,"status":"PAUSED"}"#).unwrap();
        assert_eq!(s.status, ConsentState::Unknown);
        assert!(s.id.is_none());
    }

    #[test]
    fn signed_consent_keeps_metadata_verbatim() {
        let json = serde_json::json!({
            "ver": "2.0.0",
            "txnid": "t-1",
            "consentId": "c-1",
            "status": "ACTIVE",
            "createTimestamp": "2026-01-01T00:00:00.000Z",
            "signedConsent": "eyJhbGciOiJSUzI1NiJ9..sig",
            "ConsentUse": {"logUri": "", "count": 1}
        });
        let sc: SignedConsent = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(sc.consent_id, "c-1");
        assert_eq!(sc.signed_consent, "eyJhbGciOiJSUzI1NiJ9..sig");
        assert_eq!(sc.metadata["ConsentUse"]["count"], 1);
        assert_eq!(sc.metadata["status"], "ACTIVE");
        assert_eq!(serde_json::to_value(&sc).unwrap(), json);
    }

    #[test]
    fn fi_fetch_response_indexes_by_link_ref() {
        let resp: FiFetchResponse = serde_json::from_value(serde_json::json!({
            "ver": "2.0.0",
            "txnid": "t-1",
            "FI": [{
                "fipID": "FIP-1",
                "data": [
                    {"linkRefNumber": "L1", "maskedAccNumber": "XXXX1234", "encryptedFI": "ZW5jMQ=="},
                    {"linkRefNumber": "L2", "encryptedFI": "ZW5jMg=="}
                ]
            }]
        }))
        .unwrap();
        let pairs: Vec<_> = resp.encrypted_by_link_ref().collect();
        assert_eq!(pairs, vec![("L1", "ZW5jMQ=="), ("L2", "ZW5jMg==")]);
        assert!(resp.fi[0].key_material.is_none());
    }

    #[test]
    fn partial_fip_key_material_is_relayed_as_sent() {
        let json = serde_json::json!({
            "fipID": "FIP-1",
            "data": [],
            "KeyMaterial": {
                "cryptoAlg": "ECDH",
                "curve": "Curve25519",
                "DHPublicKey": {"expiry": "2026-03-01T10:30:00.000Z", "KeyValue": "ZmlwLWtleQ=="},
                "Nonce": "bm9uY2U="
            }
        });
        let fip: FipData = serde_json::from_value(json.clone()).unwrap();
        let km = fip.key_material.as_ref().unwrap();
        assert_eq!(km.key_value(), Some("ZmlwLWtleQ=="));
        assert!(km.params.is_none());
        assert_eq!(serde_json::to_value(&fip).unwrap(), json);
    }
}
