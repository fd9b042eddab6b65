//! End-to-end consent flow against a mock AA, including FI session
//! bookkeeping.

use std::sync::Arc;

use aa_client::types::FiDataRange;
use aa_client::{
    AaApiConfig, AaApiError, AaClient, ConsentFlow, ConsentPayloadBuilder, ConsentState,
    CustomerIdentifiers, ErrorKind, SessionStore,
};
use aa_crypto::{CryptoError, EphemeralKeys, FreshKeyProvider, KeyMaterialProvider};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn flow_with(mock_server: &MockServer, keys: Arc<dyn KeyMaterialProvider>) -> ConsentFlow {
    let config = AaApiConfig::local_mock(&mock_server.uri(), "test-token").unwrap();
    ConsentFlow::new(AaClient::new(config).unwrap(), keys, SessionStore::new())
}

fn test_flow(mock_server: &MockServer) -> ConsentFlow {
    flow_with(mock_server, Arc::new(FreshKeyProvider::new()))
}

fn window() -> FiDataRange {
    ConsentPayloadBuilder::default().policy().fi_data_range.clone()
}

async fn mount_fi_request(mock_server: &MockServer, session_id: &str) {
    Mock::given(method("POST"))
        .and(path("/FI/request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ver": "2.0.0",
            "sessionId": session_id
        })))
        .mount(mock_server)
        .await;
}

fn fi_payload() -> serde_json::Value {
    serde_json::json!({
        "ver": "2.0.0",
        "FI": [{
            "fipID": "FIP-1",
            "data": [{"linkRefNumber": "L1", "encryptedFI": "ZW5j"}]
        }]
    })
}

struct UnavailableKeys;

impl KeyMaterialProvider for UnavailableKeys {
    fn generate(&self) -> Result<EphemeralKeys, CryptoError> {
        Err(CryptoError::MissingKeySource {
            path: "/nonexistent/keys.json".into(),
            reason: "No such file or directory".into(),
        })
    }

    fn provider_name(&self) -> &str {
        "unavailable"
    }
}

#[tokio::test]
async fn full_flow_for_mobile_number() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);
    let doc = ConsentPayloadBuilder::default().build(&CustomerIdentifiers::with_mobile("9999999999"));
    let txn = doc.txnid.clone();

    Mock::given(method("POST"))
        .and(path("/Consent"))
        .and(body_partial_json(serde_json::json!({"txnid": txn})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ConsentHandle": "h-1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Consent/handle"))
        .and(body_partial_json(serde_json::json!({"txnid": txn, "ConsentHandle": "h-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ConsentStatus": {"id": "c-1", "status": "ACTIVE"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Consent/fetch"))
        .and(body_partial_json(serde_json::json!({"txnid": txn, "consentId": "c-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "consentId": "c-1",
            "signedConsent": "sig-c-1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/FI/request"))
        .and(body_partial_json(serde_json::json!({
            "txnid": txn,
            "Consent": {"id": "c-1", "digitalSignature": "sig-c-1"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sessionId": "sess-1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/FI/fetch"))
        .and(body_partial_json(serde_json::json!({"txnid": txn, "sessionId": "sess-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(fi_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = flow.client();
    let handle = client.create_consent(&doc).await.unwrap();
    let status = client.resolve_consent_id(&txn, &handle).await.unwrap();
    assert_eq!(status.status, ConsentState::Active);
    let consent_id = status.consent_id.unwrap();
    let signed = client.fetch_signature(&txn, &consent_id).await.unwrap();

    let session_id = flow
        .request_fi_data(&txn, &consent_id, &signed.signed_consent, &window())
        .await
        .unwrap();
    assert_eq!(session_id, "sess-1");
    assert!(flow.sessions().contains(&txn));

    let fetched = flow
        .fetch_fi_data(&txn, Some("sess-1"), "FIP-1", &["L1".into()])
        .await
        .unwrap();
    assert_eq!(fetched.session.session_id, "sess-1");
    assert_eq!(fetched.payload.fi[0].data[0].encrypted_fi, "ZW5j");
    assert!(!flow.sessions().contains(&txn));
}

#[tokio::test]
async fn stored_key_matches_published_public_key() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);
    mount_fi_request(&mock_server, "sess-1").await;

    flow.request_fi_data("txn-1", "c-1", "sig", &window())
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let published = body["KeyMaterial"]["DHPublicKey"]["KeyValue"].as_str().unwrap();

    let session = flow.sessions().get("txn-1").unwrap();
    assert_eq!(session.private_key.public_key().to_base64(), published);
}

#[tokio::test]
async fn failed_fi_request_stores_no_session() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);

    Mock::given(method("POST"))
        .and(path("/FI/request"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad consent"))
        .mount(&mock_server)
        .await;

    let err = flow
        .request_fi_data("txn-1", "c-1", "sig", &window())
        .await
        .unwrap_err();
    assert_eq!(err.upstream_status(), Some(400));
    assert!(flow.sessions().is_empty());
}

#[tokio::test]
async fn key_material_failure_is_config_error_and_skips_upstream() {
    let mock_server = MockServer::start().await;
    let flow = flow_with(&mock_server, Arc::new(UnavailableKeys));

    Mock::given(method("POST"))
        .and(path("/FI/request"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = flow
        .request_fi_data("txn-1", "c-1", "sig", &window())
        .await
        .unwrap_err();
    assert!(matches!(err, AaApiError::KeyMaterial(_)));
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test]
async fn fetch_without_session_is_not_found() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);

    let err = flow
        .fetch_fi_data("unknown-txn", None, "FIP-1", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AaApiError::SessionNotFound(ref t) if t == "unknown-txn"));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn fetch_with_other_session_id_is_mismatch() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);
    mount_fi_request(&mock_server, "sess-1").await;

    flow.request_fi_data("txn-1", "c-1", "sig", &window())
        .await
        .unwrap();
    let err = flow
        .fetch_fi_data("txn-1", Some("sess-other"), "FIP-1", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AaApiError::SessionMismatch { .. }));
    assert!(flow.sessions().contains("txn-1"));
}

#[tokio::test]
async fn failed_fetch_keeps_session_for_retry() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);
    mount_fi_request(&mock_server, "sess-1").await;

    Mock::given(method("POST"))
        .and(path("/FI/fetch"))
        .respond_with(ResponseTemplate::new(202).set_body_string("pending"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/FI/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fi_payload()))
        .mount(&mock_server)
        .await;

    flow.request_fi_data("txn-1", "c-1", "sig", &window())
        .await
        .unwrap();
    let before = flow.sessions().get("txn-1").unwrap();

    let err = flow
        .fetch_fi_data("txn-1", None, "FIP-1", &["L1".into()])
        .await
        .unwrap_err();
    assert_eq!(err.upstream_status(), Some(202));
    assert_eq!(flow.sessions().get("txn-1").unwrap(), before);

    let fetched = flow
        .fetch_fi_data("txn-1", None, "FIP-1", &["L1".into()])
        .await
        .unwrap();
    assert_eq!(fetched.session, before);
    assert!(flow.sessions().is_empty());
}

#[tokio::test]
async fn fetch_with_partial_fip_key_material_consumes_session() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);
    mount_fi_request(&mock_server, "sess-1").await;

    let mut payload = fi_payload();
    payload["FI"][0]["KeyMaterial"] = serde_json::json!({
        "DHPublicKey": {"KeyValue": "ZmlwLWtleQ=="}
    });
    Mock::given(method("POST"))
        .and(path("/FI/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(&mock_server)
        .await;

    flow.request_fi_data("txn-1", "c-1", "sig", &window())
        .await
        .unwrap();
    let fetched = flow
        .fetch_fi_data("txn-1", None, "FIP-1", &["L1".into()])
        .await
        .unwrap();
    assert_eq!(
        fetched.payload.fi[0].key_material.as_ref().unwrap().key_value(),
        Some("ZmlwLWtleQ==")
    );
    assert!(flow.sessions().is_empty());
}

#[tokio::test]
async fn second_fi_request_replaces_session() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);

    Mock::given(method("POST"))
        .and(path("/FI/request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sessionId": "sess-1"})))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_fi_request(&mock_server, "sess-2").await;

    flow.request_fi_data("txn-1", "c-1", "sig", &window())
        .await
        .unwrap();
    flow.request_fi_data("txn-1", "c-1", "sig", &window())
        .await
        .unwrap();

    assert_eq!(flow.sessions().len(), 1);
    assert_eq!(flow.sessions().get("txn-1").unwrap().session_id, "sess-2");
}

#[tokio::test]
async fn concurrent_transactions_keep_separate_sessions() {
    let mock_server = MockServer::start().await;
    let flow = test_flow(&mock_server);
    mount_fi_request(&mock_server, "sess-shared").await;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let flow = flow.clone();
            tokio::spawn(async move {
                flow.request_fi_data(&format!("txn-{i}"), "c-1", "sig", &window())
                    .await
                    .unwrap();
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    assert_eq!(flow.sessions().len(), 8);
    let keys: std::collections::HashSet<String> = (0..8)
        .map(|i| {
            flow.sessions()
                .get(&format!("txn-{i}"))
                .unwrap()
                .private_key
                .public_key()
                .to_base64()
        })
        .collect();
    assert_eq!(keys.len(), 8);
}
