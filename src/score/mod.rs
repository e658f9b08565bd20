//! Confidence scoring and coverage classification
//!
//! The confidence score is a heuristic proxy for "did the model follow the
//! schema and keep its own arithmetic internally consistent". It is not a
//! measure of ground-truth accuracy. The penalty weights and the premium
//! tolerance are behavioral constants observed in production reports; do
//! not tune them without re-validating the escalation threshold.

use regex::Regex;

use crate::models::{CoverageStatus, ValidatedRecord};

/// Penalty when the contracts list came back empty
pub const PENALTY_EMPTY_CONTRACTS: f32 = 0.2;

/// Penalty when the diagnosis table came back empty
pub const PENALTY_EMPTY_DIAGNOSIS: f32 = 0.2;

/// Penalty per contract whose date is not `YYYY-MM-DD`
pub const PENALTY_MALFORMED_DATE: f32 = 0.05;

/// Penalty when the declared total disagrees with the contract rows
pub const PENALTY_TOTAL_MISMATCH: f32 = 0.3;

/// Absolute tolerance for the declared-total check, in KRW
pub const TOTAL_TOLERANCE_WON: i64 = 10_000;

/// Insured-to-recommended ratio below which coverage is insufficient
pub const INSUFFICIENT_RATIO: f64 = 0.70;

/// Compute the self-consistency confidence score for a record.
///
/// Starts at 1.0 and subtracts penalties for empty sections, malformed
/// contract dates, and a declared `totalPremium` that disagrees with the
/// sum over active contracts by more than [`TOTAL_TOLERANCE_WON`].
/// Clamped to a minimum of 0.
pub fn confidence(record: &ValidatedRecord) -> f32 {
    let mut score = 1.0_f32;

    if record.contracts.is_empty() {
        score -= PENALTY_EMPTY_CONTRACTS;
    }

    if record.diagnosis_items.is_empty() {
        score -= PENALTY_EMPTY_DIAGNOSIS;
    }

    let date_re = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    for contract in &record.contracts {
        if !date_re.is_match(contract.contract_date.trim()) {
            score -= PENALTY_MALFORMED_DATE;
        }
    }

    let declared = record.total_premium;
    let derived = record.active_premium_sum();
    if (declared - derived).abs() > TOTAL_TOLERANCE_WON {
        score -= PENALTY_TOTAL_MISMATCH;
    }

    score.max(0.0)
}

/// Classify coverage sufficiency from the two amount columns.
///
/// Pure threshold function: zero insured is uninsured, below 70% of the
/// recommendation is insufficient, below 100% is caution, at or above the
/// recommendation is sufficient.
pub fn classify_coverage(recommended: i64, insured: i64) -> CoverageStatus {
    if insured <= 0 {
        return CoverageStatus::Uninsured;
    }
    if insured >= recommended {
        return CoverageStatus::Sufficient;
    }
    if (insured as f64) < INSUFFICIENT_RATIO * recommended as f64 {
        CoverageStatus::Insufficient
    } else {
        CoverageStatus::Caution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contract, DiagnosisItem, PaymentStatus};
    use proptest::prelude::*;

    fn contract(date: &str, premium: i64, status: PaymentStatus) -> Contract {
        Contract {
            contract_date: date.to_string(),
            monthly_premium: premium,
            payment_status: status,
            ..Default::default()
        }
    }

    fn consistent_record() -> ValidatedRecord {
        ValidatedRecord {
            contracts: vec![
                contract("2020-01-15", 100_000, PaymentStatus::Active),
                contract("2018-07-01", 50_000, PaymentStatus::Active),
            ],
            diagnosis_items: vec![DiagnosisItem {
                coverage_name: "암진단".to_string(),
                ..Default::default()
            }],
            total_premium: 150_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_consistent_record_scores_full() {
        assert_eq!(confidence(&consistent_record()), 1.0);
    }

    #[test]
    fn test_empty_sections_penalized() {
        let mut record = consistent_record();
        record.contracts.clear();
        record.total_premium = 0;
        assert!((confidence(&record) - 0.8).abs() < 1e-6);

        record.diagnosis_items.clear();
        assert!((confidence(&record) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_date_penalized_per_contract() {
        let mut record = consistent_record();
        record.contracts[0].contract_date = "2020.01.15".to_string();
        record.contracts[1].contract_date = "2018년 7월".to_string();
        assert!((confidence(&record) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_total_mismatch_beyond_tolerance() {
        let mut record = consistent_record();
        record.total_premium = 150_000 + TOTAL_TOLERANCE_WON; // exactly at tolerance
        assert_eq!(confidence(&record), 1.0);

        record.total_premium = 150_000 + TOTAL_TOLERANCE_WON + 1;
        assert!((confidence(&record) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_completed_contracts_excluded_from_total_check() {
        let mut record = consistent_record();
        record
            .contracts
            .push(contract("2001-01-01", 0, PaymentStatus::Completed));
        assert_eq!(confidence(&record), 1.0);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let record = ValidatedRecord {
            contracts: (0..20)
                .map(|_| contract("bad-date", 10_000, PaymentStatus::Active))
                .collect(),
            total_premium: 9_999_999,
            ..Default::default()
        };
        assert_eq!(confidence(&record), 0.0);
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(classify_coverage(100, 0), CoverageStatus::Uninsured);
        assert_eq!(classify_coverage(100, 69), CoverageStatus::Insufficient);
        assert_eq!(classify_coverage(100, 70), CoverageStatus::Caution);
        assert_eq!(classify_coverage(100, 99), CoverageStatus::Caution);
        assert_eq!(classify_coverage(100, 100), CoverageStatus::Sufficient);
        assert_eq!(classify_coverage(100, 150), CoverageStatus::Sufficient);
    }

    proptest! {
        /// The classification is a total pure function of the ratio.
        #[test]
        fn prop_classification_matches_ratio(
            recommended in 1i64..1_000_000_000,
            insured in 0i64..1_000_000_000,
        ) {
            let status = classify_coverage(recommended, insured);
            let expected = if insured == 0 {
                CoverageStatus::Uninsured
            } else if insured >= recommended {
                CoverageStatus::Sufficient
            } else if (insured as f64) < INSUFFICIENT_RATIO * recommended as f64 {
                CoverageStatus::Insufficient
            } else {
                CoverageStatus::Caution
            };
            prop_assert_eq!(status, expected);
        }

        /// Shortfall derivation never goes negative.
        #[test]
        fn prop_shortfall_non_negative(
            recommended in 0i64..1_000_000_000,
            insured in 0i64..1_000_000_000,
        ) {
            let mut item = crate::models::DiagnosisItem {
                recommended_amount: recommended,
                insured_amount: insured,
                ..Default::default()
            };
            item.rederive();
            prop_assert!(item.shortfall_amount >= 0);
            prop_assert_eq!(item.shortfall_amount, (recommended - insured).max(0));
        }
    }
}
