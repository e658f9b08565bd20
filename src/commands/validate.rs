use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use chrono::NaiveDate;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::models::DraftRecord;
use crate::validation::{self, BackendSelector};

/// Validate one report PDF from the command line and print the result
pub async fn validate(
    file: PathBuf,
    draft: Option<PathBuf>,
    backend: String,
    parallel: bool,
    as_of: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let payload = Bytes::from(
        std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?,
    );

    let draft_record = match draft {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<DraftRecord>(&text)
                .with_context(|| format!("Failed to parse draft {}", path.display()))?
        }
        None => DraftRecord::default(),
    };

    let Some(selector) = BackendSelector::parse(&backend) else {
        bail!("unknown backend selector: {backend} (expected auto, gemini, openai, or claude)");
    };

    let as_of = match as_of {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("Invalid as-of date: {s} (expected YYYY-MM-DD)"))?,
        None => chrono::Utc::now().date_naive(),
    };

    let config = Config::from_env()?;
    config.validate()?;
    let client = BackendClient::new(config.backends)?;

    validation::require_payload(&payload)?;
    let outcome =
        validation::run(&client, &payload, &draft_record, selector, parallel, as_of).await?;

    tracing::info!(
        mode = ?outcome.mode,
        backend = ?outcome.record.source_model,
        confidence = outcome.record.confidence,
        "Validation finished"
    );

    if let Some(meta) = &outcome.parallel {
        tracing::info!(
            chunks = meta.chunk_count,
            failed = meta.failed_chunks,
            total_ms = meta.total_ms,
            api_ms = meta.api_ms,
            "Chunk diagnostics"
        );
    }

    let json = serde_json::to_string_pretty(&outcome.record)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Result written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
