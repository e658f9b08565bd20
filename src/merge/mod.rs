//! Merge and deduplication of per-chunk results
//!
//! Combines N per-chunk records into one document record. Info blocks are
//! taken from the first chunk that captured them, list sections are
//! concatenated in chunk order, duplicate contract and diagnosis rows
//! produced by overlapping table headers are dropped, and the aggregate
//! totals are recomputed from the final contract list. No chunk's
//! self-reported total is trusted.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{Contract, ValidatedRecord};
use crate::score;

/// Outcome of one chunk: a normalized record or an error marker.
///
/// Error markers contribute nothing to the merged arrays; they exist so
/// the caller can report which page ranges failed.
#[derive(Debug)]
pub enum ChunkOutcome {
    Ok(ValidatedRecord),
    Failed(String),
}

/// One chunk's page range and outcome, as fed to the reducer
#[derive(Debug)]
pub struct ChunkResult {
    /// 1-based inclusive page range of the chunk
    pub pages: (usize, usize),
    pub outcome: ChunkOutcome,
}

/// Per-chunk diagnostic row surfaced in response metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDetail {
    pub page_start: usize,
    pub page_end: usize,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Identity of a contract row for deduplication
fn contract_key(c: &Contract) -> (Option<u32>, String, String) {
    (c.sequence_no, c.contract_date.clone(), c.insurer.clone())
}

/// Merge all chunk outcomes into one record.
///
/// Also returns the per-chunk diagnostic rows so the caller can surface
/// partial failures without treating them as errors.
pub fn merge(results: Vec<ChunkResult>) -> (ValidatedRecord, Vec<ChunkDetail>) {
    let mut merged = ValidatedRecord::default();
    let mut details = Vec::with_capacity(results.len());

    let mut contract_slots: HashMap<(Option<u32>, String, String), usize> = HashMap::new();
    let mut seen_coverages: HashSet<String> = HashSet::new();

    for result in results {
        let (start, end) = result.pages;
        let record = match result.outcome {
            ChunkOutcome::Ok(record) => {
                details.push(ChunkDetail {
                    page_start: start,
                    page_end: end,
                    status: "ok",
                    error: None,
                });
                record
            }
            ChunkOutcome::Failed(error) => {
                details.push(ChunkDetail {
                    page_start: start,
                    page_end: end,
                    status: "failed",
                    error: Some(error),
                });
                continue;
            }
        };

        // Info blocks: first chunk that captured them wins, later chunks
        // never override.
        if merged.customer_info.is_empty() && !record.customer_info.is_empty() {
            merged.customer_info = record.customer_info;
        }
        if merged.agent_info.is_empty() && !record.agent_info.is_empty() {
            merged.agent_info = record.agent_info;
        }
        if merged.source_model.is_none() {
            merged.source_model = record.source_model;
        }

        for contract in record.contracts {
            match contract_slots.entry(contract_key(&contract)) {
                Entry::Vacant(slot) => {
                    slot.insert(merged.contracts.len());
                    merged.contracts.push(contract);
                }
                Entry::Occupied(slot) => {
                    // Prefer the duplicate that captured the premium figure.
                    let kept = &mut merged.contracts[*slot.get()];
                    if kept.monthly_premium == 0 && contract.monthly_premium != 0 {
                        *kept = contract;
                    }
                }
            }
        }

        for item in record.diagnosis_items {
            // First occurrence wins; later duplicates are dropped whole.
            if seen_coverages.insert(item.coverage_name.clone()) {
                merged.diagnosis_items.push(item);
            }
        }

        merged
            .terminated_contracts
            .extend(record.terminated_contracts);
        merged
            .product_coverage_details
            .extend(record.product_coverage_details);
        merged.corrections.extend(record.corrections);
    }

    merged
        .contracts
        .sort_by_key(|c| c.sequence_no.unwrap_or(0));

    merged.recompute_totals();
    merged.confidence = score::confidence(&merged);

    (merged, details)
}
