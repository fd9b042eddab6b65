//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AA Consent API",
        description = "Account Aggregator consent flow: create a consent request for a customer, \
track its status, fetch the signed consent, request FI data and fetch the encrypted FI payload.\n\n\
AA errors are relayed as 502 with the upstream status and body in `error.details`."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::consent::create_consent,
        crate::routes::consent::consent_status,
        crate::routes::consent::consent_signature,
        crate::routes::fi::request_fi_data,
        crate::routes::fi::fetch_fi_data,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::consent::CreateConsentRequest,
            crate::routes::consent::CreateConsentResponse,
            crate::routes::consent::ConsentStatusRequest,
            crate::routes::consent::ConsentStatusResponse,
            crate::routes::consent::ConsentSignatureRequest,
            crate::routes::fi::FiRequestRequest,
            crate::routes::fi::FiRequestResponse,
            crate::routes::fi::FiFetchRequest,
        ),
    ),
    tags(
        (name = "consent", description = "Consent creation, status and signed artefact"),
        (name = "fi", description = "FI data request and fetch"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
