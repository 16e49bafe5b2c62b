use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::confidence::SpecMatch;
use crate::fragment::normalize_code_text;
use crate::parser::{SPEC_CODE_PATTERN, is_spec_code};

const NATURAL_LANGUAGE_CONFIDENCE: f64 = 0.5;
const REQUIRED_KEYS: [&str; 3] = ["spec_code", "page_code", "confidence"];

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n```").expect("valid fenced json regex")
});

static NL_SPEC_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SPEC_CODE_PATTERN).expect("valid spec code regex"));

static NL_PAGE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]\d{1,3}(?:-\d+)?").expect("valid page code regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionResult {
    pub spec_code: Option<String>,
    pub page_code: Option<String>,
    pub confidence: f64,
    pub reasoning: String,
}

impl VisionResult {
    pub fn unparsed() -> Self {
        Self {
            spec_code: None,
            page_code: None,
            confidence: 0.0,
            reasoning: "failed to parse model response".to_string(),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.to_match().is_some()
    }

    pub fn to_match(&self) -> Option<SpecMatch> {
        let spec_code = normalize_code_text(self.spec_code.as_deref()?);
        let page_code = normalize_code_text(self.page_code.as_deref()?);
        if page_code.is_empty() || !is_spec_code(&spec_code) {
            return None;
        }

        Some(SpecMatch {
            spec_code,
            page_code,
            confidence: self.confidence,
            spec_confidence: self.confidence,
            page_confidence: self.confidence,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Ocr,
    Vision,
}

impl ResultSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ocr => "ocr",
            Self::Vision => "vision",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arbitration {
    pub matches: Vec<SpecMatch>,
    pub source: ResultSource,
}

pub fn parse_vision_response(text: &str) -> VisionResult {
    let strategies: [(&str, fn(&str) -> Option<VisionResult>); 4] = [
        ("direct_json", parse_direct_json),
        ("fenced_json", parse_fenced_json),
        ("embedded_object", parse_embedded_object),
        ("natural_language", parse_natural_language),
    ];

    for (name, strategy) in strategies {
        match strategy(text) {
            Some(result) => {
                info!(
                    strategy = name,
                    spec = ?result.spec_code,
                    page = ?result.page_code,
                    confidence = result.confidence,
                    "parsed vision response"
                );
                return result;
            }
            None => debug!(strategy = name, "vision parser did not apply"),
        }
    }

    let preview = text.chars().take(200).collect::<String>();
    warn!(response = %preview, "failed to parse vision response");
    VisionResult::unparsed()
}

pub fn arbitrate(
    ocr: Vec<SpecMatch>,
    vision: Option<&VisionResult>,
    threshold: f64,
    min_confidence: f64,
) -> Arbitration {
    let ocr_best = ocr.first().map(|found| found.confidence);
    if ocr_best.is_some_and(|confidence| confidence >= threshold) {
        return Arbitration {
            matches: ocr,
            source: ResultSource::Ocr,
        };
    }

    let usable = vision.and_then(VisionResult::to_match).filter(|found| {
        let confident = found.confidence >= min_confidence;
        if !confident {
            debug!(
                confidence = found.confidence,
                min_confidence,
                "vision result below minimum confidence"
            );
        }
        confident
    });
    if let Some(found) = usable {
        info!(
            ocr_best = ocr_best.unwrap_or(0.0),
            threshold,
            spec = %found.spec_code,
            page = %found.page_code,
            "low OCR confidence; using vision result"
        );
        return Arbitration {
            matches: vec![found],
            source: ResultSource::Vision,
        };
    }

    Arbitration {
        matches: ocr,
        source: ResultSource::Ocr,
    }
}

fn parse_direct_json(text: &str) -> Option<VisionResult> {
    from_json_text(text.trim())
}

fn parse_fenced_json(text: &str) -> Option<VisionResult> {
    let body = FENCED_JSON.captures(text)?.get(1)?.as_str();
    from_json_text(body)
}

fn parse_embedded_object(text: &str) -> Option<VisionResult> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (offset, character) in text[start..].char_indices() {
        match character {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return from_json_text(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_natural_language(text: &str) -> Option<VisionResult> {
    let spec = NL_SPEC_CODE.find(text)?;
    // the page pattern also matches inside the spec code ("J2" in "12J2")
    let page = NL_PAGE_CODE
        .find_iter(text)
        .find(|page| page.end() <= spec.start() || page.start() >= spec.end())?;

    Some(VisionResult {
        spec_code: Some(normalize_code_text(spec.as_str())),
        page_code: Some(page.as_str().to_string()),
        confidence: NATURAL_LANGUAGE_CONFIDENCE,
        reasoning: "extracted from natural language".to_string(),
    })
}

fn from_json_text(text: &str) -> Option<VisionResult> {
    let value = serde_json::from_str::<Value>(text).ok()?;
    from_json_object(value.as_object()?)
}

// codes may be null when the model found nothing
fn from_json_object(object: &Map<String, Value>) -> Option<VisionResult> {
    if !REQUIRED_KEYS.iter().all(|key| object.contains_key(*key)) {
        return None;
    }

    let confidence = object.get("confidence")?.as_f64()?;
    if !(0.0..=1.0).contains(&confidence) {
        return None;
    }

    Some(VisionResult {
        spec_code: code_field(object.get("spec_code")),
        page_code: code_field(object.get("page_code")),
        confidence,
        reasoning: object
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn code_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
