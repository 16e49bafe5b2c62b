use serde::Serialize;
use tracing::{info, warn};

use crate::confidence::{ConfidenceEvaluator, SpecMatch, top_n};
use crate::config::LocatorConfig;
use crate::file_index::{FileIndex, SpecFile};
use crate::fragment::TextFragment;
use crate::geometry::GeometryCalculator;
use crate::parser::{PageCode, PageStrategy, SpecCode, extract_page_codes, parse_spec_codes};
use crate::vision::{ResultSource, VisionResult, arbitrate};


/// What the recognizer saw, returned alongside every outcome after text was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub fragment_texts: Vec<String>,
    pub spec_codes: Vec<SpecCode>,
    pub page_codes: Vec<PageCode>,
    pub page_strategy: PageStrategy,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoText,
    NoSpecCode,
    NoPageCode,
    NoMatch,
    FileNotFoundInDb,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoText => "NO_TEXT",
            Self::NoSpecCode => "NO_SPEC_CODE",
            Self::NoPageCode => "NO_PAGE_CODE",
            Self::NoMatch => "NO_MATCH",
            Self::FileNotFoundInDb => "FILE_NOT_FOUND_IN_DB",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NoText => "Failed to recognize text in image.",
            Self::NoSpecCode => "Failed to identify spec code from image.",
            Self::NoPageCode => "Failed to identify page code from image.",
            Self::NoMatch => "Failed to pair a spec code with a page code.",
            Self::FileNotFoundInDb => {
                "Spec code and page identified but file not found in database."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    NoTextRecognized,
    NoSpecCodeFound {
        diagnostics: Diagnostics,
    },
    NoPageCodeFound {
        diagnostics: Diagnostics,
    },
    NoViableMatch {
        diagnostics: Diagnostics,
    },
    Matched {
        matches: Vec<SpecMatch>,
        strategy: PageStrategy,
        diagnostics: Diagnostics,
    },
}

impl Recognition {
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::NoTextRecognized => Some(ErrorCode::NoText),
            Self::NoSpecCodeFound { .. } => Some(ErrorCode::NoSpecCode),
            Self::NoPageCodeFound { .. } => Some(ErrorCode::NoPageCode),
            Self::NoViableMatch { .. } => Some(ErrorCode::NoMatch),
            Self::Matched { .. } => None,
        }
    }

    pub fn matches(&self) -> &[SpecMatch] {
        match self {
            Self::Matched { matches, .. } => matches,
            _ => &[],
        }
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::NoTextRecognized => None,
            Self::NoSpecCodeFound { diagnostics }
            | Self::NoPageCodeFound { diagnostics }
            | Self::NoViableMatch { diagnostics }
            | Self::Matched { diagnostics, .. } => Some(diagnostics),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocateOutcome {
    Failed {
        error: ErrorCode,
        diagnostics: Option<Diagnostics>,
    },
    FileNotIndexed {
        best: SpecMatch,
        candidates: Vec<SpecMatch>,
        source: ResultSource,
        diagnostics: Option<Diagnostics>,
    },
    Found {
        best: SpecMatch,
        candidates: Vec<SpecMatch>,
        source: ResultSource,
        file: SpecFile,
    },
}

impl LocateOutcome {
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Failed { error, .. } => Some(*error),
            Self::FileNotIndexed { .. } => Some(ErrorCode::FileNotFoundInDb),
            Self::Found { .. } => None,
        }
    }

    pub fn best(&self) -> Option<&SpecMatch> {
        match self {
            Self::Failed { .. } => None,
            Self::FileNotIndexed { best, .. } | Self::Found { best, .. } => Some(best),
        }
    }
}

/// Fragments to a ranked list of (spec, page) pairings. Pure: no I/O.
pub fn recognize(fragments: &[TextFragment], config: &LocatorConfig) -> Recognition {
    let usable = fragments
        .iter()
        .filter(|fragment| !fragment.text.trim().is_empty() && !fragment.is_degenerate())
        .count();
    if usable == 0 {
        info!(fragments = fragments.len(), "no usable text in fragments");
        return Recognition::NoTextRecognized;
    }

    let geometry = GeometryCalculator::new(&config.geometry);
    let spec_codes = parse_spec_codes(fragments);
    let extraction = extract_page_codes(fragments, &config.page, &geometry);
    let page_strategy = extraction.strategy();

    let diagnostics = Diagnostics {
        fragment_texts: fragments
            .iter()
            .map(|fragment| fragment.text.clone())
            .collect(),
        spec_codes,
        page_codes: extraction.into_codes(),
        page_strategy,
    };

    if diagnostics.spec_codes.is_empty() {
        info!(fragments = fragments.len(), "no spec code recognized");
        return Recognition::NoSpecCodeFound { diagnostics };
    }
    if diagnostics.page_codes.is_empty() {
        info!(
            spec_codes = diagnostics.spec_codes.len(),
            "no page code recognized"
        );
        return Recognition::NoPageCodeFound { diagnostics };
    }

    let evaluator = ConfidenceEvaluator::new(config.confidence.clone());
    let matches = evaluator.evaluate(&diagnostics.spec_codes, &diagnostics.page_codes);
    if matches.is_empty() {
        info!(
            min_confidence = config.confidence.min_confidence,
            "no pairing reached minimum confidence"
        );
        return Recognition::NoViableMatch { diagnostics };
    }

    info!(
        spec = %matches[0].spec_code,
        page = %matches[0].page_code,
        confidence = matches[0].confidence,
        strategy = page_strategy.as_str(),
        "recognized spec page"
    );
    Recognition::Matched {
        matches,
        strategy: page_strategy,
        diagnostics,
    }
}

/// Recognize, let a usable vision answer stand in for weak OCR, then resolve the best
/// pairing to an indexed file.
pub fn locate(
    fragments: &[TextFragment],
    index: &FileIndex,
    config: &LocatorConfig,
    vision: Option<&VisionResult>,
) -> LocateOutcome {
    let recognition = recognize(fragments, config);
    let failure = recognition.error_code();
    let diagnostics = recognition.diagnostics().cloned();
    let ocr_matches = match recognition {
        Recognition::Matched { matches, .. } => matches,
        _ => Vec::new(),
    };

    let arbitration = arbitrate(
        ocr_matches,
        vision,
        config.ocr_confidence_threshold,
        config.confidence.min_confidence,
    );
    let Some(best) = arbitration.matches.first().cloned() else {
        let error = failure.unwrap_or(ErrorCode::NoMatch);
        warn!(error = error.as_str(), "locate failed");
        return LocateOutcome::Failed { error, diagnostics };
    };
    let candidates = top_n(&arbitration.matches, config.max_candidates);

    match index.find_file(&best.spec_code, &best.page_code) {
        Some(file) => LocateOutcome::Found {
            best,
            candidates,
            source: arbitration.source,
            file: file.clone(),
        },
        None => {
            warn!(
                spec = %best.spec_code,
                page = %best.page_code,
                "recognized page is not in the file index"
            );
            LocateOutcome::FileNotIndexed {
                best,
                candidates,
                source: arbitration.source,
                diagnostics,
            }
        }
    }
}
