//! Response normalization for model output
//!
//! Models are instructed to answer with one JSON object, but real output
//! arrives fenced in markdown, prefixed with prose, or with drifted field
//! names. This module recovers the JSON, reconciles the known key-name
//! drift on the terminated-contracts list, fills required nested blocks
//! with defaults, and stamps the producing backend.
//!
//! The normalizer never fabricates array contents: a section absent from
//! the model's output becomes an empty array, not invented entries.

use serde_json::{Map, Value};
use tracing::debug;

use crate::backend::BackendId;
use crate::error::NormalizeError;
use crate::models::{
    AgentInfo, Contract, CustomerInfo, DiagnosisItem, ProductCoverage, TerminatedContract,
    ValidatedRecord,
};

/// Canonical field name for the terminated-contracts list
pub const TERMINATED_KEY: &str = "terminatedContracts";

/// Exact synonyms observed in model output for the terminated list
pub const TERMINATED_SYNONYMS: &[&str] = &[
    "terminatedContracts",
    "terminated_contracts",
    "cancelledContracts",
    "canceledContracts",
    "lapsedContracts",
    "expiredContracts",
    "해지계약",
    "소멸계약",
];

/// Substrings marking a drifted terminated-list key not in the synonym set
pub const TERMINATED_MARKERS: &[&str] =
    &["해지", "소멸", "실효", "terminated", "lapsed", "cancel"];

/// Parse and normalize one model response into a [`ValidatedRecord`].
///
/// Tries a fenced ```json block, then any fenced block, then the first
/// balanced `{...}` span, then the trimmed text itself; fails with
/// [`NormalizeError::Unparsable`] when none of them parses as JSON.
pub fn normalize(raw: &str, backend: BackendId) -> Result<ValidatedRecord, NormalizeError> {
    let value = parse_json(raw)?;

    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(NormalizeError::Unparsable(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            )))
        }
    };

    reconcile_terminated_key(&mut map);

    let mut record = ValidatedRecord {
        customer_info: section::<CustomerInfo>(&map, "customerInfo"),
        agent_info: section::<AgentInfo>(&map, "agentInfo"),
        contracts: section::<Vec<Contract>>(&map, "contracts"),
        terminated_contracts: section::<Vec<TerminatedContract>>(&map, TERMINATED_KEY),
        diagnosis_items: section::<Vec<DiagnosisItem>>(&map, "diagnosisItems"),
        product_coverage_details: section::<Vec<ProductCoverage>>(&map, "productCoverageDetails"),
        total_premium: won(&map, "totalPremium"),
        active_monthly_premium: won(&map, "activeMonthlyPremium"),
        source_model: Some(backend),
        confidence: 0.0,
        corrections: section::<Vec<String>>(&map, "corrections"),
    };

    // Shortfall and status are derived columns; the model's arithmetic on
    // them is not trusted.
    for item in &mut record.diagnosis_items {
        item.rederive();
    }

    debug!(
        backend = %backend,
        contracts = record.contracts.len(),
        terminated = record.terminated_contracts.len(),
        diagnosis = record.diagnosis_items.len(),
        "Normalized model response"
    );

    Ok(record)
}

/// Locate and parse the JSON payload inside raw model text
fn parse_json(raw: &str) -> Result<Value, NormalizeError> {
    for candidate in candidates(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            return Ok(value);
        }
    }

    let preview: String = raw.chars().take(200).collect();
    Err(NormalizeError::Unparsable(preview))
}

/// Candidate JSON spans, in recovery order
fn candidates(raw: &str) -> Vec<String> {
    let mut spans = Vec::new();

    if let Some(fenced) = extract_fenced(raw, "```json") {
        spans.push(fenced);
    }
    if let Some(fenced) = extract_fenced(raw, "```") {
        spans.push(fenced);
    }
    if let Some(span) = extract_balanced(raw) {
        spans.push(span);
    }
    spans.push(raw.trim().to_string());

    spans
}

/// Extract the content of the first code fence opened by `marker`
fn extract_fenced(text: &str, marker: &str) -> Option<String> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    // Skip a language identifier on the opening line of a generic fence
    let content_start = rest.find('\n').map(|i| i + 1).unwrap_or(0);
    let end = rest[content_start..].find("```")?;
    Some(rest[content_start..content_start + end].trim().to_string())
}

/// Extract the first balanced `{...}` span, honoring string literals
fn extract_balanced(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + c.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Resolve which of the present top-level keys holds the terminated list.
///
/// Exact synonyms are checked first in a fixed priority order, then any
/// key containing a lapse/cancel marker substring. Pure function over the
/// key set.
pub fn resolve_terminated_key<'a>(keys: impl Iterator<Item = &'a str> + Clone) -> Option<&'a str> {
    for synonym in TERMINATED_SYNONYMS {
        if let Some(key) = keys.clone().find(|k| k == synonym) {
            return Some(key);
        }
    }

    keys.clone().find(|k| {
        let lower = k.to_ascii_lowercase();
        TERMINATED_MARKERS.iter().any(|m| lower.contains(m))
    })
}

/// Adopt the resolved terminated key as canonical and drop every other
/// candidate so the list cannot appear twice under different names
fn reconcile_terminated_key(map: &mut Map<String, Value>) {
    let resolved = {
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        resolve_terminated_key(keys.iter().copied()).map(str::to_string)
    };

    let adopted = match resolved {
        Some(key) => map.remove(&key).unwrap_or(Value::Array(Vec::new())),
        None => Value::Array(Vec::new()),
    };

    let stale: Vec<String> = map
        .keys()
        .filter(|k| k.as_str() != TERMINATED_KEY && is_terminated_candidate(k))
        .cloned()
        .collect();
    for key in stale {
        map.remove(&key);
    }

    map.insert(TERMINATED_KEY.to_string(), adopted);
}

fn is_terminated_candidate(key: &str) -> bool {
    if TERMINATED_SYNONYMS.contains(&key) {
        return true;
    }
    let lower = key.to_ascii_lowercase();
    TERMINATED_MARKERS.iter().any(|m| lower.contains(m))
}

/// Deserialize one section, falling back to defaults on absence or on a
/// section-local type mismatch (one bad section never discards the rest)
fn section<T: serde::de::DeserializeOwned + Default>(map: &Map<String, Value>, key: &str) -> T {
    map.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Read a KRW amount, tolerating number-as-string output
fn won(map: &Map<String, Value>, key: &str) -> i64 {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f.round() as i64).unwrap_or(0)
        }),
        Some(Value::String(s)) => s.replace(',', "").trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "customerInfo": {"name": "김민수", "birthDate": "1985-03-02", "gender": "남", "phone": ""},
        "contracts": [{
            "id": "c1", "sequenceNo": 1, "insurer": "삼성화재",
            "product": "무배당 건강보험", "contractDate": "2019-05-01",
            "paymentCycle": "월납", "paymentTermLabel": "20년납",
            "maturityLabel": "100세", "monthlyPremium": 89000,
            "paymentStatus": "active"
        }],
        "diagnosisItems": [{
            "coverageName": "암진단", "recommendedAmount": 30000000,
            "insuredAmount": 21000000, "shortfallAmount": 0, "status": "sufficient"
        }],
        "totalPremium": 89000,
        "activeMonthlyPremium": 89000
    }"#;

    #[test]
    fn test_normalize_plain_json() {
        let record = normalize(BODY, BackendId::Gemini).unwrap();
        assert_eq!(record.customer_info.name, "김민수");
        assert_eq!(record.contracts.len(), 1);
        assert_eq!(record.source_model, Some(BackendId::Gemini));
        assert!(record.terminated_contracts.is_empty());
    }

    #[test]
    fn test_fenced_and_plain_normalize_identically() {
        let fenced = format!("결과는 다음과 같습니다:\n```json\n{BODY}\n```\n");
        let from_fenced = normalize(&fenced, BackendId::Openai).unwrap();
        let from_plain = normalize(BODY, BackendId::Openai).unwrap();

        assert_eq!(
            serde_json::to_value(&from_fenced).unwrap(),
            serde_json::to_value(&from_plain).unwrap()
        );
    }

    #[test]
    fn test_balanced_brace_extraction_with_prose() {
        let wrapped = format!("Here is the extraction. {BODY} Let me know if anything is off.");
        let record = normalize(&wrapped, BackendId::Claude).unwrap();
        assert_eq!(record.contracts.len(), 1);
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_extraction() {
        let raw = r#"note: {"customerInfo": {"name": "김 {특약} 담당"}, "contracts": []}"#;
        let record = normalize(raw, BackendId::Gemini).unwrap();
        assert_eq!(record.customer_info.name, "김 {특약} 담당");
    }

    #[test]
    fn test_unparsable_response() {
        let result = normalize("죄송합니다. 문서를 읽을 수 없습니다.", BackendId::Gemini);
        assert!(matches!(result, Err(NormalizeError::Unparsable(_))));
    }

    #[test]
    fn test_non_object_json_rejected() {
        let result = normalize(r#"[1, 2, 3]"#, BackendId::Gemini);
        assert!(matches!(result, Err(NormalizeError::Unparsable(_))));
    }

    #[test]
    fn test_terminated_key_synonym_adopted() {
        let raw = r#"{
            "contracts": [],
            "cancelledContracts": [{"id": "t1", "insurer": "DB손해보험", "status": "cancelled"}]
        }"#;
        let record = normalize(raw, BackendId::Gemini).unwrap();
        assert_eq!(record.terminated_contracts.len(), 1);
        assert_eq!(record.terminated_contracts[0].insurer, "DB손해보험");
    }

    #[test]
    fn test_terminated_marker_substring_adopted() {
        let raw = r#"{"해지된계약목록": [{"id": "t1", "status": "lapsed"}]}"#;
        let record = normalize(raw, BackendId::Gemini).unwrap();
        assert_eq!(record.terminated_contracts.len(), 1);
    }

    #[test]
    fn test_duplicate_terminated_candidates_deduplicated() {
        let raw = r#"{
            "terminatedContracts": [{"id": "keep", "status": "lapsed"}],
            "lapsedContracts": [{"id": "drop", "status": "lapsed"}]
        }"#;
        let record = normalize(raw, BackendId::Gemini).unwrap();
        assert_eq!(record.terminated_contracts.len(), 1);
        assert_eq!(record.terminated_contracts[0].id, "keep");
    }

    #[test]
    fn test_missing_sections_default_not_fabricated() {
        let record = normalize(r#"{"contracts": []}"#, BackendId::Claude).unwrap();
        assert!(record.contracts.is_empty());
        assert!(record.diagnosis_items.is_empty());
        assert!(record.product_coverage_details.is_empty());
        assert_eq!(record.agent_info, Default::default());
        assert_eq!(record.customer_info.name, "");
    }

    #[test]
    fn test_diagnosis_derived_columns_recomputed() {
        let raw = r#"{
            "diagnosisItems": [{
                "coverageName": "뇌졸중진단", "recommendedAmount": 20000000,
                "insuredAmount": 5000000, "shortfallAmount": 1, "status": "sufficient"
            }]
        }"#;
        let record = normalize(raw, BackendId::Gemini).unwrap();
        let item = &record.diagnosis_items[0];
        assert_eq!(item.shortfall_amount, 15_000_000);
        assert_eq!(item.status, crate::models::CoverageStatus::Insufficient);
    }

    #[test]
    fn test_amount_as_string_tolerated() {
        let raw = r#"{"totalPremium": "178,500"}"#;
        let record = normalize(raw, BackendId::Gemini).unwrap();
        assert_eq!(record.total_premium, 178_500);
    }

    #[test]
    fn test_resolve_terminated_key_priority() {
        let keys = ["contracts", "lapsedContracts", "terminatedContracts"];
        assert_eq!(
            resolve_terminated_key(keys.iter().copied()),
            Some("terminatedContracts")
        );

        let keys = ["contracts", "실효해지계약"];
        assert_eq!(
            resolve_terminated_key(keys.iter().copied()),
            Some("실효해지계약")
        );

        let keys = ["contracts", "diagnosisItems"];
        assert_eq!(resolve_terminated_key(keys.iter().copied()), None);
    }
}
