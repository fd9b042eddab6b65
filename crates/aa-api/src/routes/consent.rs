//! # Consent Routes
//!
//! Consent creation, status resolution and signature retrieval. Each
//! handler validates its input, makes exactly one AA call, and relays the
//! outcome. The transaction id minted at creation is returned to the
//! caller, who passes it back on every later call of the flow.

use aa_client::CustomerIdentifiers;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_id, Validate};
use crate::state::AppState;

/// Build the consent router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/consent", post(create_consent))
        .route("/v1/consent/status", post(consent_status))
        .route("/v1/consent/signature", post(consent_signature))
}

// -- Request/Response DTOs ----------------------------------------------------

/// Customer identifiers. Field names are kept as clients already send them.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateConsentRequest {
    /// 10 to 15 digits, as a JSON number or string.
    #[serde(rename = "Mobile", deserialize_with = "digits")]
    #[schema(example = "9999999999")]
    pub mobile: String,
    #[serde(rename = "PAN", default)]
    pub pan: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "Aadhar", default, deserialize_with = "optional_digits")]
    pub aadhar: Option<String>,
}

impl Validate for CreateConsentRequest {
    fn validate(&self) -> Result<(), String> {
        if !(10..=15).contains(&self.mobile.len()) || !all_digits(&self.mobile) {
            return Err("Mobile must be 10 to 15 digits".into());
        }
        if let Some(pan) = &self.pan {
            if pan.len() != 10 || !pan.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err("PAN must be 10 alphanumeric characters".into());
            }
        }
        if let Some(email) = &self.email {
            if !email.contains('@') || email.len() > 254 {
                return Err("email must be a valid address".into());
            }
        }
        if let Some(aadhar) = &self.aadhar {
            if aadhar.len() != 12 || !all_digits(aadhar) {
                return Err("Aadhar must be 12 digits".into());
            }
        }
        Ok(())
    }
}

impl From<CreateConsentRequest> for CustomerIdentifiers {
    fn from(req: CreateConsentRequest) -> Self {
        Self {
            mobile: req.mobile,
            pan: req.pan,
            email: req.email,
            aadhar: req.aadhar,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsentResponse {
    pub message: String,
    pub txn_id: String,
    pub consent_handle: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConsentStatusRequest {
    pub txn_id: String,
    pub consent_handle: String,
}

impl Validate for ConsentStatusRequest {
    fn validate(&self) -> Result<(), String> {
        require_id("txnId", &self.txn_id)?;
        require_id("consentHandle", &self.consent_handle)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsentStatusResponse {
    pub txn_id: String,
    pub consent_handle: String,
    /// Null until the consent leaves `PENDING`.
    pub consent_id: Option<String>,
    /// `PENDING`, `ACTIVE`, `REJECTED`, `REVOKED`, `EXPIRED` or `UNKNOWN`.
    pub consent_status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConsentSignatureRequest {
    pub txn_id: String,
    pub consent_id: String,
}

impl Validate for ConsentSignatureRequest {
    fn validate(&self) -> Result<(), String> {
        require_id("txnId", &self.txn_id)?;
        require_id("consentId", &self.consent_id)
    }
}

/// Signed consent plus every field of the AA response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSignatureResponse {
    pub txn_id: String,
    #[serde(flatten)]
    pub consent: aa_client::SignedConsent,
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

impl NumberOrString {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

fn digits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    NumberOrString::deserialize(deserializer).map(NumberOrString::into_string)
}

fn optional_digits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<NumberOrString>::deserialize(deserializer).map(|v| v.map(NumberOrString::into_string))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/consent: Build a consent document and submit it to the AA.
#[utoipa::path(
    post,
    path = "/v1/consent",
    request_body = CreateConsentRequest,
    responses(
        (status = 200, description = "Consent requested", body = CreateConsentResponse),
        (status = 422, description = "Invalid customer identifiers", body = crate::error::ErrorBody),
        (status = 502, description = "AA API error", body = crate::error::ErrorBody),
    ),
    tag = "consent"
)]
async fn create_consent(
    State(state): State<AppState>,
    body: Result<Json<CreateConsentRequest>, JsonRejection>,
) -> Result<Json<CreateConsentResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let doc = state.builder.build(&req.into());
    tracing::info!(txn_id = %doc.txnid, "creating consent");

    let handle = state.flow.client().create_consent(&doc).await?;

    Ok(Json(CreateConsentResponse {
        message: "Customer created successfully".into(),
        txn_id: doc.txnid,
        consent_handle: handle.0,
    }))
}

/// POST /v1/consent/status: Resolve a consent handle to its id and status.
///
/// Safe to poll.
#[utoipa::path(
    post,
    path = "/v1/consent/status",
    request_body = ConsentStatusRequest,
    responses(
        (status = 200, description = "Current consent status", body = ConsentStatusResponse),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 502, description = "AA API error", body = crate::error::ErrorBody),
    ),
    tag = "consent"
)]
async fn consent_status(
    State(state): State<AppState>,
    body: Result<Json<ConsentStatusRequest>, JsonRejection>,
) -> Result<Json<ConsentStatusResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let handle = aa_client::ConsentHandle(req.consent_handle);
    let status = state
        .flow
        .client()
        .resolve_consent_id(&req.txn_id, &handle)
        .await?;

    Ok(Json(ConsentStatusResponse {
        txn_id: req.txn_id,
        consent_handle: handle.0,
        consent_id: status.consent_id,
        consent_status: status.status.as_str().to_string(),
    }))
}

/// POST /v1/consent/signature: Fetch the signed consent artefact.
#[utoipa::path(
    post,
    path = "/v1/consent/signature",
    request_body = ConsentSignatureRequest,
    responses(
        (status = 200, description = "Signed consent with AA metadata", body = Object),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 502, description = "AA API error", body = crate::error::ErrorBody),
    ),
    tag = "consent"
)]
async fn consent_signature(
    State(state): State<AppState>,
    body: Result<Json<ConsentSignatureRequest>, JsonRejection>,
) -> Result<Json<ConsentSignatureResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let consent = state
        .flow
        .client()
        .fetch_signature(&req.txn_id, &req.consent_id)
        .await?;

    Ok(Json(ConsentSignatureResponse {
        txn_id: req.txn_id,
        consent,
    }))
}
