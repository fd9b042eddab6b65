//! # FI Routes
//!
//! FI request and FI fetch. The request handler draws key material and
//! opens a session for the transaction; the fetch handler consumes that
//! session when the AA returns the data.

use aa_client::types::FiDataRange;
use aa_client::FiFetchResponse;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_id, Validate};
use crate::state::AppState;

/// Maximum number of link references in one fetch.
const MAX_LINK_REFS: usize = 100;

/// Build the FI router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/fi/request", post(request_fi_data))
        .route("/v1/fi/fetch", post(fetch_fi_data))
}

// -- Request/Response DTOs ----------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FiRequestRequest {
    pub txn_id: String,
    pub consent_id: String,
    /// `signedConsent` from the signature call.
    pub signature: String,
    /// Start of the data range. Defaults to the consent policy's range.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl FiRequestRequest {
    fn window(&self, default: &FiDataRange) -> FiDataRange {
        match (self.from, self.to) {
            (Some(from), Some(to)) => FiDataRange { from, to },
            _ => default.clone(),
        }
    }
}

impl Validate for FiRequestRequest {
    fn validate(&self) -> Result<(), String> {
        require_id("txnId", &self.txn_id)?;
        require_id("consentId", &self.consent_id)?;
        if self.signature.trim().is_empty() {
            return Err("signature must not be empty".into());
        }
        match (self.from, self.to) {
            (Some(from), Some(to)) if from >= to => Err("from must be before to".into()),
            (Some(_), None) | (None, Some(_)) => {
                Err("from and to must be given together".into())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FiRequestResponse {
    pub message: String,
    pub txn_id: String,
    pub consent_id: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FiFetchRequest {
    pub txn_id: String,
    /// Must match the stored session when given.
    #[serde(default)]
    pub session_id: Option<String>,
    pub fip_id: String,
    pub link_ref_numbers: Vec<String>,
}

impl Validate for FiFetchRequest {
    fn validate(&self) -> Result<(), String> {
        require_id("txnId", &self.txn_id)?;
        require_id("fipId", &self.fip_id)?;
        if let Some(session_id) = &self.session_id {
            require_id("sessionId", session_id)?;
        }
        if self.link_ref_numbers.is_empty() {
            return Err("linkRefNumbers must not be empty".into());
        }
        if self.link_ref_numbers.len() > MAX_LINK_REFS {
            return Err(format!("linkRefNumbers must not exceed {MAX_LINK_REFS} entries"));
        }
        for (i, link_ref) in self.link_ref_numbers.iter().enumerate() {
            require_id(&format!("linkRefNumbers[{i}]"), link_ref)?;
        }
        Ok(())
    }
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/fi/request: Request FI data and open a session.
#[utoipa::path(
    post,
    path = "/v1/fi/request",
    request_body = FiRequestRequest,
    responses(
        (status = 200, description = "FI data requested", body = FiRequestResponse),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 500, description = "Key material unavailable", body = crate::error::ErrorBody),
        (status = 502, description = "AA API error", body = crate::error::ErrorBody),
    ),
    tag = "fi"
)]
async fn request_fi_data(
    State(state): State<AppState>,
    body: Result<Json<FiRequestRequest>, JsonRejection>,
) -> Result<Json<FiRequestResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let window = req.window(&state.builder.policy().fi_data_range);

    let session_id = state
        .flow
        .request_fi_data(&req.txn_id, &req.consent_id, &req.signature, &window)
        .await?;

    Ok(Json(FiRequestResponse {
        message: "FI data requested".into(),
        txn_id: req.txn_id,
        consent_id: req.consent_id,
        session_id,
    }))
}

/// POST /v1/fi/fetch: Fetch the encrypted FI payload for the transaction's
/// session. The session is discarded once the AA returns the data.
#[utoipa::path(
    post,
    path = "/v1/fi/fetch",
    request_body = FiFetchRequest,
    responses(
        (status = 200, description = "Encrypted FI payload as returned by the AA", body = Object),
        (status = 404, description = "No session for the transaction", body = crate::error::ErrorBody),
        (status = 409, description = "Session id does not match", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 502, description = "AA API error", body = crate::error::ErrorBody),
    ),
    tag = "fi"
)]
async fn fetch_fi_data(
    State(state): State<AppState>,
    body: Result<Json<FiFetchRequest>, JsonRejection>,
) -> Result<Json<FiFetchResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let fetched = state
        .flow
        .fetch_fi_data(
            &req.txn_id,
            req.session_id.as_deref(),
            &req.fip_id,
            &req.link_ref_numbers,
        )
        .await?;
    Ok(Json(fetched.payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fi_request(json: serde_json::Value) -> FiRequestRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn window_defaults_to_policy_range() {
        let default = FiDataRange {
            from: Utc.with_ymd_and_hms(2019, 12, 6, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2023, 7, 6, 0, 0, 0).unwrap(),
        };
        let req = fi_request(serde_json::json!({
            "txnId": "t", "consentId": "c", "signature": "s"
        }));
        assert!(req.validate().is_ok());
        assert_eq!(req.window(&default), default);

        let req = fi_request(serde_json::json!({
            "txnId": "t", "consentId": "c", "signature": "s",
            "from": "2024-01-01T00:00:00Z", "to": "2024-02-01T00:00:00Z"
        }));
        assert_eq!(
            req.window(&default).from,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn window_must_be_ordered_and_complete() {
        let reversed = fi_request(serde_json::json!({
            "txnId": "t", "consentId": "c", "signature": "s",
            "from": "2024-02-01T00:00:00Z", "to": "2024-01-01T00:00:00Z"
        }));
        assert_eq!(reversed.validate().unwrap_err(), "from must be before to");

        let half = fi_request(serde_json::json!({
            "txnId": "t", "consentId": "c", "signature": "s",
            "from": "2024-02-01T00:00:00Z"
        }));
        assert!(half.validate().is_err());
    }

    #[test]
    fn fetch_requires_link_refs() {
        let req: FiFetchRequest = serde_json::from_value(serde_json::json!({
            "txnId": "t", "fipId": "FIP-1", "linkRefNumbers": []
        }))
        .unwrap();
        assert_eq!(req.validate().unwrap_err(), "linkRefNumbers must not be empty");

        let req: FiFetchRequest = serde_json::from_value(serde_json::json!({
            "txnId": "t", "fipId": "FIP-1", "linkRefNumbers": ["L1", ""]
        }))
        .unwrap();
        assert_eq!(
            req.validate().unwrap_err(),
            "linkRefNumbers[1] must not be empty"
        );
    }
}
