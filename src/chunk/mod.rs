//! Chunked parallel processing for oversized reports
//!
//! Long reports blow past single-call output limits, so the document is
//! partitioned into page-range chunks, each chunk is extracted into a
//! standalone PDF and sent to the model adapter directly (not through the
//! escalation chain), and the per-chunk records are merged afterwards.
//!
//! Every chunk's success or failure is captured independently: a failed
//! chunk is recorded with an error marker and excluded from the merge, and
//! never aborts its siblings.

use std::time::Instant;

use bytes::Bytes;
use chrono::NaiveDate;
use futures::future::join_all;
use lopdf::Document;
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::prompt::ChunkContext;
use crate::backend::{BackendClient, BackendId};
use crate::error::{Error, Result};
use crate::merge::{self, ChunkDetail, ChunkOutcome, ChunkResult};
use crate::models::{DraftRecord, ValidatedRecord};
use crate::normalize;

/// Documents up to this many pages are processed as a single chunk
pub const SINGLE_CHUNK_MAX_PAGES: usize = 10;

/// Documents up to this many pages are split into [`MID_DOC_CHUNKS`]
pub const THREE_CHUNK_MAX_PAGES: usize = 21;

/// Chunk count for mid-size documents
pub const MID_DOC_CHUNKS: usize = 3;

/// Chunk count for large documents
pub const LARGE_DOC_CHUNKS: usize = 4;

/// 1-based inclusive page range of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    /// Number of pages in the range
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Diagnostics returned alongside the merged record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelMeta {
    /// Wall-clock duration of the whole parallel run, in milliseconds
    pub total_ms: u64,

    /// Duration of the model-call phase only, in milliseconds
    pub api_ms: u64,

    pub chunk_count: usize,
    pub succeeded_chunks: usize,
    pub failed_chunks: usize,

    /// Per-chunk page range and status
    pub chunks: Vec<ChunkDetail>,
}

/// Number of chunks for a given page count
pub fn chunk_target(page_count: usize) -> usize {
    if page_count <= SINGLE_CHUNK_MAX_PAGES {
        1
    } else if page_count <= THREE_CHUNK_MAX_PAGES {
        MID_DOC_CHUNKS
    } else {
        LARGE_DOC_CHUNKS
    }
}

/// Partition a page count into roughly equal ranges.
///
/// Each chunk takes the ceiling of the remaining pages over the remaining
/// chunks, so sizes differ by at most one and the final chunk ends exactly
/// at the last page.
pub fn partition(page_count: usize) -> Vec<PageRange> {
    if page_count == 0 {
        return Vec::new();
    }

    let target = chunk_target(page_count);
    let mut ranges = Vec::with_capacity(target);
    let mut start = 1usize;

    for remaining_chunks in (1..=target).rev() {
        let remaining_pages = page_count - start + 1;
        let size = remaining_pages.div_ceil(remaining_chunks);
        let end = (start + size - 1).min(page_count);
        ranges.push(PageRange { start, end });
        start = end + 1;
    }

    ranges
}

/// Count pages of an in-memory PDF
pub fn page_count(payload: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(payload)?;
    Ok(doc.get_pages().len())
}

/// Extract one page range into a standalone PDF payload
fn extract_range(payload: &[u8], range: PageRange) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(payload)?;

    let delete: Vec<u32> = doc
        .get_pages()
        .keys()
        .copied()
        .filter(|&n| (n as usize) < range.start || (n as usize) > range.end)
        .collect();

    doc.delete_pages(&delete);
    doc.prune_objects();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Validate an oversized document chunk-by-chunk against one backend.
///
/// The draft hint is passed to every chunk unfiltered: size-driven chunk
/// boundaries do not align with the report's logical sections, so there is
/// nothing section-shaped to filter by.
pub async fn validate_parallel(
    client: &BackendClient,
    payload: &Bytes,
    draft: &DraftRecord,
    backend: BackendId,
    as_of: NaiveDate,
) -> Result<(ValidatedRecord, ParallelMeta)> {
    let started = Instant::now();

    let pages = {
        let payload = payload.clone();
        tokio::task::spawn_blocking(move || page_count(&payload))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??
    };
    let ranges = partition(pages);

    info!(
        pages = pages,
        chunks = ranges.len(),
        backend = %backend,
        "Starting chunked parallel validation"
    );

    // Extract every chunk into its own payload concurrently. The source
    // bytes are read-only, so the extractions need no coordination.
    let extractions = join_all(ranges.iter().map(|&range| {
        let payload = payload.clone();
        async move {
            if range.start == 1 && range.end == pages {
                // Single-chunk documents are sent as-is.
                return Ok(payload.to_vec());
            }
            tokio::task::spawn_blocking(move || extract_range(&payload, range))
                .await
                .map_err(|e| Error::Io(std::io::Error::other(e)))?
        }
    }))
    .await;

    // Model-call phase: one adapter invocation per extracted chunk, all in
    // flight together, outcomes captured independently.
    let api_started = Instant::now();
    let outcomes = join_all(ranges.iter().zip(extractions).map(|(&range, extracted)| {
        async move {
            let chunk_payload = match extracted {
                Ok(bytes) => Bytes::from(bytes),
                Err(e) => {
                    warn!(start = range.start, end = range.end, error = %e, "Chunk extraction failed");
                    return ChunkResult {
                        pages: (range.start, range.end),
                        outcome: ChunkOutcome::Failed(e.to_string()),
                    };
                }
            };

            let context = ChunkContext {
                first_page: range.start,
                last_page: range.end,
                total_pages: pages,
            };

            let outcome = match client.invoke(backend, &chunk_payload, draft, Some(context)).await {
                Ok(raw) => match normalize::normalize(&raw, backend) {
                    Ok(mut record) => {
                        record.apply_payment_rules(as_of);
                        ChunkOutcome::Ok(record)
                    }
                    Err(e) => {
                        warn!(start = range.start, end = range.end, error = %e, "Chunk normalization failed");
                        ChunkOutcome::Failed(e.to_string())
                    }
                },
                Err(e) => {
                    warn!(start = range.start, end = range.end, error = %e, "Chunk backend call failed");
                    ChunkOutcome::Failed(e.to_string())
                }
            };

            ChunkResult {
                pages: (range.start, range.end),
                outcome,
            }
        }
    }))
    .await;
    let api_ms = api_started.elapsed().as_millis() as u64;

    let chunk_count = outcomes.len();
    let (record, chunks) = merge::merge(outcomes);

    let failed_chunks = chunks.iter().filter(|c| c.status == "failed").count();
    let meta = ParallelMeta {
        total_ms: started.elapsed().as_millis() as u64,
        api_ms,
        chunk_count,
        succeeded_chunks: chunk_count - failed_chunks,
        failed_chunks,
        chunks,
    };

    info!(
        chunks = meta.chunk_count,
        failed = meta.failed_chunks,
        total_ms = meta.total_ms,
        "Chunked parallel validation finished"
    );

    Ok((record, meta))
}
