//! Validation entry point
//!
//! Dispatches one validation request to the right path: a single
//! explicitly-requested backend (with bounded rate-limit retry), the
//! escalation chain for "auto", or the chunked parallel processor for
//! oversized documents.

use bytes::Bytes;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::backend::{BackendClient, BackendId};
use crate::chunk::{self, ParallelMeta};
use crate::error::{BackendError, Error, Result};
use crate::models::{DraftRecord, ValidatedRecord};
use crate::orchestrator::{self, ESCALATION_ORDER};
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::{normalize, score};

/// Documents below this size ignore the caller's `parallel` hint
pub const PARALLEL_SIZE_THRESHOLD_BYTES: usize = 5 * 1024 * 1024;

/// Rate-limit retry attempts on the explicit single-backend path
pub const RATE_LIMIT_MAX_RETRIES: u32 = 3;

/// Which backend(s) a request may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelector {
    /// Escalate through the priority order
    Auto,
    /// Exactly this backend; its unavailability is a hard failure
    Fixed(BackendId),
}

impl BackendSelector {
    /// Parse the API's backendSelector value
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("auto") {
            return Some(Self::Auto);
        }
        BackendId::parse(s).map(Self::Fixed)
    }
}

/// Execution path a request took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Single,
    Escalation,
    Parallel,
}

/// Result of one validation request
#[derive(Debug)]
pub struct ValidationOutcome {
    pub record: ValidatedRecord,
    pub mode: Mode,
    /// Chunk diagnostics, present on the parallel path only
    pub parallel: Option<ParallelMeta>,
}

/// Run one validation request end to end.
///
/// The `parallel` hint is honored only when the document exceeds
/// [`PARALLEL_SIZE_THRESHOLD_BYTES`]; smaller documents always run the
/// single-document path.
pub async fn run(
    client: &BackendClient,
    payload: &Bytes,
    draft: &DraftRecord,
    selector: BackendSelector,
    parallel_hint: bool,
    as_of: NaiveDate,
) -> Result<ValidationOutcome> {
    if parallel_hint && payload.len() > PARALLEL_SIZE_THRESHOLD_BYTES {
        let backend = parallel_backend(client, selector);
        let (record, meta) = chunk::validate_parallel(client, payload, draft, backend, as_of).await?;
        return Ok(ValidationOutcome {
            record,
            mode: Mode::Parallel,
            parallel: Some(meta),
        });
    }

    match selector {
        BackendSelector::Auto => {
            let record = orchestrator::validate(client, payload, draft, as_of).await?;
            Ok(ValidationOutcome {
                record,
                mode: Mode::Escalation,
                parallel: None,
            })
        }
        BackendSelector::Fixed(backend) => {
            let record = validate_single(client, payload, draft, backend, as_of).await?;
            Ok(ValidationOutcome {
                record,
                mode: Mode::Single,
                parallel: None,
            })
        }
    }
}

/// Explicit single-backend path. The one retry loop in the system lives
/// here: a rate-limited response is retried with exponential backoff up to
/// [`RATE_LIMIT_MAX_RETRIES`] times, then surfaced.
async fn validate_single(
    client: &BackendClient,
    payload: &Bytes,
    draft: &DraftRecord,
    backend: BackendId,
    as_of: NaiveDate,
) -> Result<ValidatedRecord> {
    let retry = RetryConfig::new(RATE_LIMIT_MAX_RETRIES);

    let raw = with_retry_if(
        &retry,
        || client.invoke(backend, payload, draft, None),
        |e| matches!(e, BackendError::RateLimited(_)),
    )
    .await?;

    let mut record = normalize::normalize(&raw, backend)?;
    record.confidence = score::confidence(&record);
    record.apply_payment_rules(as_of);
    record.recompute_totals();

    info!(
        backend = %backend,
        confidence = record.confidence,
        "Single-backend validation finished"
    );

    Ok(record)
}

/// Backend used for per-chunk calls on the parallel path: the requested
/// one, or the first configured backend in escalation order for "auto"
fn parallel_backend(client: &BackendClient, selector: BackendSelector) -> BackendId {
    match selector {
        BackendSelector::Fixed(backend) => backend,
        BackendSelector::Auto => ESCALATION_ORDER
            .into_iter()
            .find(|&b| client.is_configured(b))
            .unwrap_or(ESCALATION_ORDER[0]),
    }
}

/// Validate request inputs shared by the HTTP API and the CLI
pub fn require_payload(payload: &Bytes) -> Result<()> {
    if payload.is_empty() {
        return Err(Error::input("document payload is empty"));
    }
    Ok(())
}
