//! bojang - Korean insurance report extraction and LLM validation
//!
//! Extracts structured data (customer info, contracts, coverage
//! diagnostics) from Korean insurance-report PDFs by validating a
//! heuristic parser's draft against one or more LLM backends.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`backend`] - Uniform adapter over the LLM vendor integrations
//! - [`normalize`] - JSON recovery and key-name reconciliation of model output
//! - [`score`] - Self-consistency confidence scoring and coverage classification
//! - [`orchestrator`] - Backend escalation with early exit
//! - [`chunk`] - Page-range chunking and parallel processing of large reports
//! - [`merge`] - Merge/dedup of per-chunk results
//! - [`models`] - Core data structures
//! - [`storage`] - Read-only document store
//! - [`server`] - HTTP API
//! - [`config`] - Environment-driven configuration
//!
//! # Example
//!
//! ```no_run
//! use bojang::backend::BackendClient;
//! use bojang::config::Config;
//! use bojang::models::DraftRecord;
//! use bojang::validation::{self, BackendSelector};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = BackendClient::new(config.backends)?;
//!     let payload = Bytes::from(std::fs::read("report.pdf")?);
//!
//!     let outcome = validation::run(
//!         &client,
//!         &payload,
//!         &DraftRecord::default(),
//!         BackendSelector::Auto,
//!         false,
//!         chrono::Utc::now().date_naive(),
//!     )
//!     .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&outcome.record)?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod catalog;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod score;
pub mod server;
pub mod storage;
pub mod utils;
pub mod validation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::backend::{BackendClient, BackendId};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{
        Contract, CoverageStatus, DiagnosisItem, DraftRecord, PaymentStatus, ValidatedRecord,
    };
    pub use crate::validation::{BackendSelector, Mode, ValidationOutcome};
}

// Direct re-exports for convenience
pub use models::{DraftRecord, ValidatedRecord};
