//! Common test utilities

use bojang::config::BackendSettings;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};

/// Build an in-memory PDF with the given number of pages
pub fn build_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page_no in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {page_no}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => resources_id,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A model output whose arithmetic is internally consistent, so the
/// confidence scorer gives it a full score
pub fn consistent_model_output() -> String {
    json!({
        "customerInfo": {"name": "김민수", "birthDate": "1985-03-02", "gender": "남", "phone": ""},
        "agentInfo": {"name": "박설계", "phone": "010-0000-0000", "agency": "한빛보험대리점"},
        "contracts": [{
            "id": "c1", "sequenceNo": 1, "insurer": "삼성화재",
            "product": "무배당 건강보험", "contractDate": "2019-05-01",
            "paymentCycle": "월납", "paymentTermLabel": "20년납",
            "maturityLabel": "100세", "monthlyPremium": 89_000,
            "paymentStatus": "active"
        }],
        "terminatedContracts": [],
        "diagnosisItems": [{
            "coverageName": "암진단", "recommendedAmount": 30_000_000,
            "insuredAmount": 21_000_000, "shortfallAmount": 9_000_000,
            "status": "caution"
        }],
        "productCoverageDetails": [],
        "totalPremium": 89_000,
        "activeMonthlyPremium": 89_000
    })
    .to_string()
}

/// A model output the scorer penalizes below the escalation threshold:
/// empty diagnosis table and a declared total far from the contract rows
#[allow(dead_code)]
pub fn low_confidence_model_output() -> String {
    json!({
        "contracts": [{
            "id": "c1", "sequenceNo": 1, "insurer": "삼성화재",
            "product": "무배당 건강보험", "contractDate": "2019-05-01",
            "paymentCycle": "월납", "paymentTermLabel": "20년납",
            "maturityLabel": "100세", "monthlyPremium": 89_000,
            "paymentStatus": "active"
        }],
        "diagnosisItems": [],
        "totalPremium": 500_000
    })
    .to_string()
}

/// Wrap model text in a Gemini-shaped response body
pub fn gemini_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }]
    })
}

/// Wrap model text in an OpenAI-shaped response body
#[allow(dead_code)]
pub fn openai_body(text: &str) -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "model": "gpt-4o"
    })
}

/// Wrap model text in a Claude-shaped response body
#[allow(dead_code)]
pub fn claude_body(text: &str) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "role": "assistant",
        "stop_reason": "end_turn"
    })
}

/// Backend settings pointing every vendor at one mock server.
///
/// A backend is configured when `keys` contains its name.
pub fn mock_settings(mock_url: &str, keys: &[&str]) -> BackendSettings {
    let mut settings = BackendSettings::default();

    settings.gemini.endpoint = mock_url.to_string();
    settings.openai.endpoint = mock_url.to_string();
    settings.claude.endpoint = mock_url.to_string();

    settings.gemini.api_key = keys.contains(&"gemini").then(|| "test-key".to_string());
    settings.openai.api_key = keys.contains(&"openai").then(|| "test-key".to_string());
    settings.claude.api_key = keys.contains(&"claude").then(|| "test-key".to_string());

    settings
}

/// Path the Gemini mock must answer on, given the default model name
pub fn gemini_path() -> String {
    format!(
        "/v1beta/models/{}:generateContent",
        BackendSettings::default().gemini.model
    )
}
