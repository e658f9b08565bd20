//! REST API handlers for the validation server

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::BackendId;
use crate::chunk::ParallelMeta;
use crate::error::{Error, StoreError};
use crate::models::{DraftRecord, ValidatedRecord};
use crate::storage;
use crate::validation::{self, BackendSelector, Mode};

use super::AppState;

// ============================================================================
// API Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Validation request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    /// Key of a previously uploaded document
    pub document_key: Option<String>,

    /// Base64-encoded document bytes, alternative to `documentKey`
    pub document_bytes: Option<String>,

    /// Heuristic parser's draft, passed to the model as a hint
    pub draft_record: Option<DraftRecord>,

    /// "auto" or one concrete backend name
    #[serde(default = "default_selector")]
    pub backend_selector: String,

    /// Request chunked parallel processing; honored only for documents
    /// above the size threshold
    #[serde(default)]
    pub parallel: bool,

    /// As-of date for payment-status arithmetic; defaults to today
    pub as_of: Option<NaiveDate>,
}

fn default_selector() -> String {
    "auto".to_string()
}

/// Validation response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub record: ValidatedRecord,
    pub metadata: ValidateMetadata,
}

/// Per-request metadata
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateMetadata {
    pub request_id: Uuid,
    pub processing_time_ms: u64,
    pub backend_used: Option<BackendId>,
    pub mode: Mode,
    pub document_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_details: Option<ParallelMeta>,
}

// ============================================================================
// Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/validate", post(validate))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

/// Validate a report document
async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> axum::response::Response {
    let started = Instant::now();

    match run_validation(&state, request).await {
        Ok(mut response) => {
            response.metadata.processing_time_ms = started.elapsed().as_millis() as u64;
            (StatusCode::OK, Json(ApiResponse::success(response))).into_response()
        }
        Err(e) => (status_for(&e), Json(ErrorResponse::new(e.to_string()))).into_response(),
    }
}

async fn run_validation(
    state: &AppState,
    request: ValidateRequest,
) -> crate::error::Result<ValidateResponse> {
    let draft = request
        .draft_record
        .ok_or_else(|| Error::input("draftRecord is required"))?;

    let selector = BackendSelector::parse(&request.backend_selector).ok_or_else(|| {
        Error::input(format!(
            "unknown backendSelector: {}",
            request.backend_selector
        ))
    })?;

    let payload = resolve_payload(state, &request.document_key, &request.document_bytes).await?;
    validation::require_payload(&payload)?;

    let as_of = request
        .as_of
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let document_sha256 = storage::sha256_hex(&payload);
    let outcome = validation::run(&state.client, &payload, &draft, selector, request.parallel, as_of)
        .await?;

    Ok(ValidateResponse {
        metadata: ValidateMetadata {
            request_id: Uuid::new_v4(),
            processing_time_ms: 0, // stamped by the handler
            backend_used: outcome.record.source_model,
            mode: outcome.mode,
            document_sha256,
            chunk_details: outcome.parallel,
        },
        record: outcome.record,
    })
}

/// Resolve the document payload from inline bytes or the store
async fn resolve_payload(
    state: &AppState,
    key: &Option<String>,
    inline: &Option<String>,
) -> crate::error::Result<Bytes> {
    if let Some(encoded) = inline {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| Error::input(format!("documentBytes is not valid base64: {e}")))?;
        return Ok(Bytes::from(bytes));
    }

    match key {
        Some(key) => Ok(state.store.get(key).await?),
        None => Err(Error::input("documentKey or documentBytes is required")),
    }
}

/// Map an error to the HTTP status class it belongs to
fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Input(_) => StatusCode::BAD_REQUEST,
        Error::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        Error::Store(StoreError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Tests
// ============================================================================
