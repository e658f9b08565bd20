//! HTTP API tests against a server bound to an ephemeral port

mod common;

use std::sync::Arc;
use std::time::Instant;

use bojang::backend::BackendClient;
use bojang::server::api::create_router;
use bojang::server::AppState;
use bojang::storage::DocumentStore;
use serde_json::{json, Value};

/// Spawn the API over the given settings and store dir, returning its base URL
async fn spawn_api(settings: bojang::config::BackendSettings, store_dir: &std::path::Path) -> String {
    let state = AppState {
        client: Arc::new(BackendClient::new(settings).unwrap()),
        store: Arc::new(DocumentStore::new(store_dir)),
        start_time: Instant::now(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    format!("http://{addr}")
}

fn no_backend_settings() -> bojang::config::BackendSettings {
    common::mock_settings("http://127.0.0.1:9", &[])
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_api(no_backend_settings(), dir.path()).await;

    let response = reqwest::get(format!("{base}/api/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("healthy"));
}

#[tokio::test]
async fn test_missing_draft_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_api(no_backend_settings(), dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/validate"))
        .json(&json!({"documentKey": "r.pdf"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("draftRecord"));
}

#[tokio::test]
async fn test_missing_document_reference_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_api(no_backend_settings(), dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/validate"))
        .json(&json!({"draftRecord": {}}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_unknown_stored_document_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_api(no_backend_settings(), dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/validate"))
        .json(&json!({"documentKey": "no-such.pdf", "draftRecord": {}}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unknown_selector_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_api(no_backend_settings(), dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/validate"))
        .json(&json!({
            "documentKey": "r.pdf",
            "draftRecord": {},
            "backendSelector": "best-effort"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_backend_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("report.pdf"), common::build_pdf(2)).unwrap();

    // No backend credential configured: escalation exhausts immediately.
    let base = spawn_api(no_backend_settings(), dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/validate"))
        .json(&json!({"documentKey": "report.pdf", "draftRecord": {}}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("all backends failed"));
}

#[tokio::test]
async fn test_validate_with_stored_document_end_to_end() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::gemini_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::gemini_body(&common::consistent_model_output())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("report.pdf"), common::build_pdf(2)).unwrap();

    let base = spawn_api(common::mock_settings(&server.uri(), &["gemini"]), dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/validate"))
        .json(&json!({
            "documentKey": "report.pdf",
            "draftRecord": {},
            "backendSelector": "gemini",
            "asOf": "2024-06-01"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();

    let data = &body["data"];
    assert_eq!(data["metadata"]["mode"], json!("single"));
    assert_eq!(data["metadata"]["backendUsed"], json!("gemini"));
    assert_eq!(data["record"]["customerInfo"]["name"], json!("김민수"));
    assert_eq!(data["record"]["totalPremium"], json!(89_000));
    assert_eq!(
        data["metadata"]["documentSha256"].as_str().unwrap().len(),
        64
    );
}
