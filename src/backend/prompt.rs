//! Instruction template for report extraction
//!
//! One builder serves all three backends so their effective contracts
//! cannot drift apart. The instruction carries the target JSON schema, the
//! closed coverage catalog, numeric/date normalization rules, and the
//! policy that document content always overrides the draft hint.

use crate::catalog::COVERAGE_CATALOG;
use crate::models::DraftRecord;

/// Target output schema, kept as a literal so the models see exactly the
/// field names the normalizer expects
const OUTPUT_SCHEMA: &str = r#"{
  "customerInfo": {"name": "", "birthDate": "", "gender": "", "phone": ""},
  "agentInfo": {"name": "", "phone": "", "agency": ""},
  "contracts": [
    {
      "id": "", "sequenceNo": 1, "insurer": "", "product": "",
      "contractDate": "YYYY-MM-DD", "paymentCycle": "", "paymentTermLabel": "",
      "maturityLabel": "", "monthlyPremium": 0, "paymentStatus": "active"
    }
  ],
  "terminatedContracts": [
    {
      "id": "", "sequenceNo": 1, "insurer": "", "product": "",
      "contractDate": "YYYY-MM-DD", "paymentCycle": "", "paymentTermLabel": "",
      "maturityLabel": "", "monthlyPremium": 0,
      "status": "lapsed", "cancelReason": ""
    }
  ],
  "diagnosisItems": [
    {
      "coverageName": "", "recommendedAmount": 0, "insuredAmount": 0,
      "shortfallAmount": 0, "status": "insufficient"
    }
  ],
  "productCoverageDetails": [
    {
      "productName": "", "insurer": "",
      "coverages": [
        {
          "sequenceNo": 1, "category": "", "companyCoverageName": "",
          "standardCoverageName": "", "insuredAmount": 0
        }
      ]
    }
  ],
  "totalPremium": 0,
  "activeMonthlyPremium": 0
}"#;

/// Optional chunk context injected into the instruction
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkContext {
    /// 1-based first page of the chunk within the source report
    pub first_page: usize,

    /// 1-based last page of the chunk
    pub last_page: usize,

    /// Total pages of the source report
    pub total_pages: usize,
}

/// Build the extraction instruction for one model call.
///
/// `draft` is serialized into the instruction as a hint; `chunk` is present
/// only on the parallel path and tells the model it is looking at a page
/// slice of a larger report.
pub fn build_instruction(draft: &DraftRecord, chunk: Option<ChunkContext>) -> String {
    let draft_json =
        serde_json::to_string_pretty(draft).unwrap_or_else(|_| "{}".to_string());

    let catalog = COVERAGE_CATALOG
        .iter()
        .map(|c| format!("- {}: {}", c.name, c.coverages.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");

    let chunk_note = match chunk {
        Some(ctx) => format!(
            "\n## 참고: 이 문서는 전체 {}페이지 보고서 중 {}~{}페이지 구간입니다. \
             이 구간에 나타나지 않는 항목은 빈 배열로 두세요.\n",
            ctx.total_pages, ctx.first_page, ctx.last_page
        ),
        None => String::new(),
    };

    format!(
        r#"당신은 한국 보험 분석 보고서(PDF)에서 구조화된 데이터를 추출·검증하는 전문가입니다.

첨부된 보험 보고서 문서를 읽고, 아래 휴리스틱 파서의 초안(draft)을 검증·보정하여
정확한 JSON을 출력하세요.
{chunk_note}
## 규칙:
1. 문서 원문의 내용이 항상 초안보다 우선합니다. 초안은 힌트일 뿐입니다.
2. 금액은 원(KRW) 단위 정수로 출력합니다 ("3,000만원" → 30000000).
3. 날짜는 반드시 YYYY-MM-DD 형식으로 정규화합니다.
4. 보장진단(diagnosisItems)의 coverageName은 아래 고정 담보 목록의 이름만 사용합니다.
   목록에 없는 담보는 출력하지 마세요.
5. 해지·실효된 계약은 반드시 "terminatedContracts" 필드에 넣으세요. 다른 필드명을
   사용하지 마세요.
6. 문서에 없는 내용을 지어내지 마세요. 해당 섹션이 없으면 빈 배열을 출력합니다.
7. 납입이 끝난 계약(paymentStatus: "completed")의 monthlyPremium은 0으로 출력합니다.

## 담보 목록 (카테고리: 담보명):
{catalog}

## 출력 JSON 스키마:
```json
{schema}
```

## 휴리스틱 파서 초안:
```json
{draft}
```

## 검증된 JSON 출력:"#,
        chunk_note = chunk_note,
        catalog = catalog,
        schema = OUTPUT_SCHEMA,
        draft = draft_json,
    )
}
