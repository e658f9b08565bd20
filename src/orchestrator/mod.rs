//! Escalation orchestration over the backend priority order
//!
//! Linear state machine with early exit: the cheap primary backend is
//! tried first and accepted outright when its self-consistency score
//! clears the threshold; otherwise the secondary and tertiary backends are
//! tried in order. The fallback backends are assumed high-accuracy and get
//! a fixed confidence instead of a re-scored threshold check.
//!
//! Every attempt's failure is caught and logged individually; a single
//! backend's error never aborts the orchestration while fallback options
//! remain.

use bytes::Bytes;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::backend::{BackendClient, BackendId};
use crate::error::{Error, Result};
use crate::models::{DraftRecord, ValidatedRecord};
use crate::normalize;
use crate::score;

/// Confidence the primary result must exceed to skip escalation
pub const CONFIDENCE_THRESHOLD: f32 = 0.85;

/// Fixed confidence stamped on an accepted secondary result
pub const SECONDARY_FIXED_CONFIDENCE: f32 = 0.95;

/// Fixed confidence stamped on an accepted tertiary result
pub const TERTIARY_FIXED_CONFIDENCE: f32 = 0.90;

/// Backend priority order: cheap/fast first, last resort last
pub const ESCALATION_ORDER: [BackendId; 3] =
    [BackendId::Gemini, BackendId::Openai, BackendId::Claude];

/// Validate a whole document through the escalation chain.
///
/// Returns the first acceptable [`ValidatedRecord`]; its `sourceModel`
/// reports which backend produced it. Fails with
/// [`Error::AllBackendsFailed`] when every configured backend failed or
/// was skipped for a missing credential.
pub async fn validate(
    client: &BackendClient,
    payload: &Bytes,
    draft: &DraftRecord,
    as_of: NaiveDate,
) -> Result<ValidatedRecord> {
    let [primary, secondary, tertiary] = ESCALATION_ORDER;
    let mut attempted = Vec::new();

    // TryPrimary: the only attempt that is scored against the threshold.
    attempted.push(primary);
    let mut low_confidence_fallback = None;
    match attempt(client, primary, payload, draft).await {
        Ok(mut record) => {
            record.confidence = score::confidence(&record);
            if record.confidence > CONFIDENCE_THRESHOLD {
                info!(
                    backend = %primary,
                    confidence = record.confidence,
                    "Primary result accepted"
                );
                return Ok(finish(record, as_of));
            }
            warn!(
                backend = %primary,
                confidence = record.confidence,
                threshold = CONFIDENCE_THRESHOLD,
                "Primary result below threshold, escalating"
            );
            low_confidence_fallback = Some(record);
        }
        Err(e) => {
            warn!(backend = %primary, error = %e, "Primary backend failed, escalating");
        }
    }

    // TrySecondary / TryTertiary: accepted on success with a fixed
    // confidence, no further threshold check.
    for (backend, fixed_confidence) in [
        (secondary, SECONDARY_FIXED_CONFIDENCE),
        (tertiary, TERTIARY_FIXED_CONFIDENCE),
    ] {
        if !client.is_configured(backend) {
            warn!(backend = %backend, "Backend not configured, skipping");
            continue;
        }

        attempted.push(backend);
        match attempt(client, backend, payload, draft).await {
            Ok(mut record) => {
                record.confidence = fixed_confidence;
                info!(backend = %backend, "Fallback result accepted");
                return Ok(finish(record, as_of));
            }
            Err(e) => {
                warn!(backend = %backend, error = %e, "Fallback backend failed");
            }
        }
    }

    // A scored-but-low primary answer still beats a hard failure when no
    // fallback is left to try.
    if let Some(record) = low_confidence_fallback {
        warn!(
            confidence = record.confidence,
            "Returning low-confidence primary result, no fallback succeeded"
        );
        return Ok(finish(record, as_of));
    }

    Err(Error::AllBackendsFailed { attempted })
}

/// One invoke-and-normalize attempt against a single backend
async fn attempt(
    client: &BackendClient,
    backend: BackendId,
    payload: &Bytes,
    draft: &DraftRecord,
) -> Result<ValidatedRecord> {
    let raw = client.invoke(backend, payload, draft, None).await?;
    let record = normalize::normalize(&raw, backend)?;
    Ok(record)
}

/// Post-acceptance pass: payment rules with the injected as-of date, then
/// totals recomputed from the final contract rows
fn finish(mut record: ValidatedRecord, as_of: NaiveDate) -> ValidatedRecord {
    record.apply_payment_rules(as_of);
    record.recompute_totals();
    record
}
