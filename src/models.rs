// Core data structures for insurance report validation

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Payment status of an in-force contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Active,
    Completed,
}

/// Terminal status of a terminated contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TerminationStatus {
    #[default]
    Lapsed,
    Cancelled,
}

/// Coverage sufficiency classification for a diagnosis item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Insufficient,
    Caution,
    Sufficient,
    #[default]
    Uninsured,
}

/// One in-force insurance contract
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Contract {
    pub id: String,

    /// Row number in the source report table, used as the merge sort key
    pub sequence_no: Option<u32>,

    /// Insurer name (e.g., "삼성생명")
    pub insurer: String,

    /// Product name
    pub product: String,

    /// Contract date, "YYYY-MM-DD"
    pub contract_date: String,

    /// Payment cycle label (e.g., "월납")
    pub payment_cycle: String,

    /// Payment term label (e.g., "20년납", "전기납", "일시납")
    pub payment_term_label: String,

    /// Maturity label (e.g., "종신", "80세")
    pub maturity_label: String,

    /// Monthly premium in KRW; reported as 0 once payment is completed
    pub monthly_premium: i64,

    /// Premium the holder paid while the contract was in its payment term.
    /// Retained when `monthly_premium` is zeroed for completed contracts.
    pub original_monthly_premium: Option<i64>,

    pub payment_status: PaymentStatus,
}

impl Contract {
    /// Derive whether the payment term has elapsed as of a given date.
    ///
    /// Returns `None` when the term label or contract date does not carry
    /// enough information to decide (the declared status stands in that
    /// case). The as-of date is injected so the computation stays
    /// deterministic.
    pub fn payment_completed_as_of(&self, as_of: NaiveDate) -> Option<bool> {
        let label = self.payment_term_label.trim();
        if label == "일시납" {
            return Some(true);
        }

        let years: u32 = label.strip_suffix("년납")?.trim().parse().ok()?;
        let start = NaiveDate::parse_from_str(self.contract_date.trim(), "%Y-%m-%d").ok()?;
        let done = start
            .with_year(start.year() + years as i32)
            .unwrap_or(start);
        Some(done <= as_of)
    }

    /// Premium counted toward historical totals, preferring the retained
    /// original figure for completed contracts
    pub fn historical_premium(&self) -> i64 {
        if self.monthly_premium != 0 {
            self.monthly_premium
        } else {
            self.original_monthly_premium.unwrap_or(0)
        }
    }
}

/// A lapsed or cancelled contract
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminatedContract {
    pub id: String,
    pub sequence_no: Option<u32>,
    pub insurer: String,
    pub product: String,
    pub contract_date: String,
    pub payment_cycle: String,
    pub payment_term_label: String,
    pub maturity_label: String,
    pub monthly_premium: i64,
    pub status: TerminationStatus,
    pub cancel_reason: Option<String>,
}

/// One row of the coverage diagnosis table
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosisItem {
    /// Coverage name from the closed catalog (see [`crate::catalog`])
    pub coverage_name: String,

    /// Recommended coverage amount in KRW
    pub recommended_amount: i64,

    /// Currently insured amount in KRW
    pub insured_amount: i64,

    /// `max(recommended - insured, 0)`
    pub shortfall_amount: i64,

    pub status: CoverageStatus,
}

impl DiagnosisItem {
    /// Recompute the derived fields from the two amount columns
    pub fn rederive(&mut self) {
        self.shortfall_amount = (self.recommended_amount - self.insured_amount).max(0);
        self.status = crate::score::classify_coverage(self.recommended_amount, self.insured_amount);
    }
}

/// Per-product coverage breakdown
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductCoverage {
    pub product_name: String,
    pub insurer: Option<String>,
    pub coverages: Vec<CoverageEntry>,
}

/// One coverage line within a product
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CoverageEntry {
    pub sequence_no: Option<u32>,

    /// Catalog category (e.g., "진단")
    pub category: String,

    /// Coverage name as printed by the insurer
    pub company_coverage_name: String,

    /// Catalog name the company name was mapped to, when the model could
    pub standard_coverage_name: Option<String>,

    pub insured_amount: i64,
}

/// Customer identification block
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerInfo {
    pub name: String,
    pub birth_date: String,
    pub gender: String,
    pub phone: String,
}

impl CustomerInfo {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.birth_date.is_empty()
            && self.gender.is_empty()
            && self.phone.is_empty()
    }
}

/// Servicing agent block
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentInfo {
    pub name: String,
    pub phone: String,
    pub agency: String,
}

impl AgentInfo {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.phone.is_empty() && self.agency.is_empty()
    }
}

/// Heuristic parser's best-effort structured guess.
///
/// Produced once per document by the upstream extractor and never mutated
/// here; the validation core only reads it as a hint for the model.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftRecord {
    pub contracts: Option<Vec<Contract>>,
    pub terminated_contracts: Option<Vec<TerminatedContract>>,
    pub diagnosis_items: Option<Vec<DiagnosisItem>>,
    pub product_coverage_details: Option<Vec<ProductCoverage>>,
}

/// LLM-corrected structured record, the sole output of the validation core
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatedRecord {
    pub customer_info: CustomerInfo,
    pub agent_info: AgentInfo,
    pub contracts: Vec<Contract>,
    pub terminated_contracts: Vec<TerminatedContract>,
    pub diagnosis_items: Vec<DiagnosisItem>,
    pub product_coverage_details: Vec<ProductCoverage>,

    /// Sum of monthly premiums over contracts still paying
    pub total_premium: i64,

    /// Same sum; kept as a separate field for report rendering
    pub active_monthly_premium: i64,

    /// Backend that produced this record
    pub source_model: Option<crate::backend::BackendId>,

    /// Self-consistency score in [0, 1]; not a ground-truth accuracy measure
    pub confidence: f32,

    /// Human-readable descriptions of what was changed against the draft
    pub corrections: Vec<String>,
}

impl ValidatedRecord {
    /// Sum of `monthly_premium` over contracts that are still paying
    pub fn active_premium_sum(&self) -> i64 {
        self.contracts
            .iter()
            .filter(|c| c.payment_status != PaymentStatus::Completed)
            .map(|c| c.monthly_premium)
            .sum()
    }

    /// Recompute the aggregate totals from the contract list.
    ///
    /// Used after merge and after an accepted validation so the returned
    /// record never carries a model-declared total that disagrees with its
    /// own contract rows.
    pub fn recompute_totals(&mut self) {
        let sum = self.active_premium_sum();
        self.total_premium = sum;
        self.active_monthly_premium = sum;
    }

    /// Zero out premiums on completed contracts, retaining the paid figure.
    ///
    /// Contracts whose payment term has provably elapsed as of `as_of` are
    /// switched to completed first. Each change appends a correction note.
    pub fn apply_payment_rules(&mut self, as_of: NaiveDate) {
        for contract in &mut self.contracts {
            if contract.payment_status == PaymentStatus::Active
                && contract.payment_completed_as_of(as_of) == Some(true)
            {
                contract.payment_status = PaymentStatus::Completed;
                self.corrections.push(format!(
                    "납입기간 경과 계약 '{}' 납입완료 처리",
                    contract.product
                ));
            }

            if contract.payment_status == PaymentStatus::Completed
                && contract.monthly_premium != 0
            {
                contract.original_monthly_premium = Some(contract.monthly_premium);
                contract.monthly_premium = 0;
                self.corrections.push(format!(
                    "납입완료 계약 '{}' 월보험료 0원 처리",
                    contract.product
                ));
            }
        }
    }
}
