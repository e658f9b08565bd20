//! Unified error handling for the bojang crate
//!
//! Domain-specific errors (`BackendError`, `NormalizeError`, `StoreError`)
//! are defined here together with the unified [`Error`] enum that wraps
//! them for use across module boundaries.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! Failures local to one backend or one chunk are absorbed and logged by
//! the orchestration layer; only exhaustion of all fallback options is
//! surfaced to the caller.

use std::io;
use thiserror::Error;

use crate::backend::BackendId;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Model output parsing and normalization errors
    Parsing,
    /// Document storage and I/O errors
    Storage,
    /// Caller input validation errors
    Input,
    /// Configuration and credential errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Errors raised by a single LLM backend invocation
#[derive(Error, Debug)]
pub enum BackendError {
    /// Credential for the backend is not configured
    #[error("backend {0} is not configured (missing credential)")]
    Unavailable(BackendId),

    /// Backend returned a non-success status
    #[error("backend {backend} returned status {status}: {body}")]
    Status {
        backend: BackendId,
        status: u16,
        body: String,
    },

    /// Backend returned 429 Too Many Requests
    #[error("backend {0} rate limited the request")]
    RateLimited(BackendId),

    /// Request timed out before the backend answered
    #[error("backend {0} request timed out")]
    Timeout(BackendId),

    /// Transport-level failure
    #[error("backend {backend} request failed: {source}")]
    Http {
        backend: BackendId,
        #[source]
        source: reqwest::Error,
    },

    /// Response body did not carry a text part where expected
    #[error("backend {0} returned an empty response body")]
    EmptyResponse(BackendId),
}

impl BackendError {
    /// Backend the failed attempt was addressed to
    pub fn backend(&self) -> BackendId {
        match self {
            Self::Unavailable(b)
            | Self::RateLimited(b)
            | Self::Timeout(b)
            | Self::EmptyResponse(b) => *b,
            Self::Status { backend, .. } | Self::Http { backend, .. } => *backend,
        }
    }
}

/// Errors raised while normalizing a model's raw text output
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// Text is not recoverable as JSON even after fence/brace extraction
    #[error("model output is not parsable as JSON: {0}")]
    Unparsable(String),
}

/// Errors raised by the document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document stored under the given key
    #[error("document not found: {0}")]
    NotFound(String),

    /// Key contains path separators or other rejected characters
    #[error("invalid document key: {0}")]
    InvalidKey(String),

    /// Underlying filesystem failure
    #[error("document store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Unified error type for the bojang crate
#[derive(Error, Debug)]
pub enum Error {
    /// Single-backend invocation failure
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Model output normalization failure
    #[error("normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Document store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Every configured backend failed or was unavailable
    #[error("all backends failed (attempted: {})", format_backends(attempted))]
    AllBackendsFailed { attempted: Vec<BackendId> },

    /// Required field missing from the caller's request
    #[error("invalid input: {0}")]
    Input(String),

    /// PDF could not be loaded or sliced
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),
}

fn format_backends(backends: &[BackendId]) -> String {
    backends
        .iter()
        .map(|b| b.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an input validation error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Check if this error is recoverable (worth retrying or escalating)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Backend(e) => !matches!(e, BackendError::Unavailable(_)),
            Self::Normalize(_) => true, // another backend may answer cleanly
            Self::Store(_) => false,
            Self::AllBackendsFailed { .. } => false,
            Self::Input(_) => false,
            Self::Pdf(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Backend(_) | Self::AllBackendsFailed { .. } => ErrorCategory::Network,
            Self::Normalize(_) | Self::Json(_) | Self::Pdf(_) => ErrorCategory::Parsing,
            Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Input(_) => ErrorCategory::Input,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
