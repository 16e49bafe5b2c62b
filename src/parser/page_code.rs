use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use super::spec_code::{contains_spec_code_shape, split_spec_code_shape};
use crate::config::PageCodeConfig;
use crate::fragment::{TextFragment, normalize_code_text};
use crate::geometry::GeometryCalculator;

/// Optional single letter followed by digits. Dashed page codes (`C11-2`, `1-11`) are
/// not recognized from fragments even though stored filenames carry them.
static PAGE_CODE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]?\d+$").expect("valid page code regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCode {
    pub page: String,
    pub confidence: f64,
    pub source_indices: Vec<usize>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStrategy {
    Anchored,
    Legacy,
}

impl PageStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anchored => "anchored",
            Self::Legacy => "legacy",
        }
    }
}

/// Page codes tagged with the strategy that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum PageExtraction {
    Anchored(Vec<PageCode>),
    Legacy(Vec<PageCode>),
}

impl PageExtraction {
    pub fn codes(&self) -> &[PageCode] {
        match self {
            Self::Anchored(codes) | Self::Legacy(codes) => codes,
        }
    }

    pub fn into_codes(self) -> Vec<PageCode> {
        match self {
            Self::Anchored(codes) | Self::Legacy(codes) => codes,
        }
    }

    pub fn strategy(&self) -> PageStrategy {
        match self {
            Self::Anchored(_) => PageStrategy::Anchored,
            Self::Legacy(_) => PageStrategy::Legacy,
        }
    }
}

#[derive(Debug, Clone)]
struct Anchor {
    index: usize,
    code: String,
    trailing: String,
}

#[derive(Debug, Clone)]
struct Candidate {
    index: usize,
    page: String,
    confidence: f64,
    score: f64,
    center: (f64, f64),
}

pub fn is_page_code_shape(normalized: &str) -> bool {
    PAGE_CODE_SHAPE.is_match(normalized)
}

/// Anchor-based extraction, falling back to the legacy extractor when it finds nothing
/// anywhere in the fragment set.
pub fn extract_page_codes(
    fragments: &[TextFragment],
    config: &PageCodeConfig,
    geometry: &GeometryCalculator,
) -> PageExtraction {
    let anchored = extract_anchored(fragments, config, geometry);
    if !anchored.is_empty() {
        info!(count = anchored.len(), "parsed page codes from anchors");
        return PageExtraction::Anchored(anchored);
    }

    let legacy = extract_legacy(fragments, config);
    info!(
        count = legacy.len(),
        "anchor pass found no page codes; used legacy extractor"
    );
    PageExtraction::Legacy(legacy)
}

pub fn extract_anchored(
    fragments: &[TextFragment],
    config: &PageCodeConfig,
    geometry: &GeometryCalculator,
) -> Vec<PageCode> {
    let anchors = find_anchors(fragments);
    debug!(anchors = anchors.len(), "detected spec code anchors");

    let mut pages = Vec::new();
    for anchor in &anchors {
        let candidates = collect_candidates(fragments, anchor, config, geometry);
        let Some(chosen) = choose_candidate(candidates, config) else {
            debug!(anchor = %anchor.code, "anchor has no page candidate in range");
            continue;
        };

        debug!(
            anchor = %anchor.code,
            page = %chosen.page,
            score = chosen.score,
            "anchor resolved page code"
        );
        let source_indices = if chosen.index == anchor.index {
            vec![anchor.index]
        } else {
            vec![anchor.index, chosen.index]
        };
        pages.push(PageCode {
            page: chosen.page,
            confidence: chosen.confidence,
            source_indices,
        });
    }

    deduplicate_pages(pages)
}

/// Any page-shaped fragment above the legacy confidence floor, no anchor required.
pub fn extract_legacy(fragments: &[TextFragment], config: &PageCodeConfig) -> Vec<PageCode> {
    let pages = fragments
        .iter()
        .enumerate()
        .filter(|(_, fragment)| !fragment.is_degenerate())
        .filter(|(_, fragment)| fragment.confidence > config.legacy_min_confidence)
        .filter_map(|(index, fragment)| {
            let normalized = fragment.normalized_text();
            is_page_code_shape(&normalized).then(|| PageCode {
                page: normalized,
                confidence: fragment.confidence,
                source_indices: vec![index],
            })
        })
        .collect::<Vec<PageCode>>();

    deduplicate_pages(pages)
}

fn find_anchors(fragments: &[TextFragment]) -> Vec<Anchor> {
    fragments
        .iter()
        .enumerate()
        .filter(|(_, fragment)| !fragment.is_degenerate())
        .filter_map(|(index, fragment)| {
            let normalized = fragment.normalized_text();
            let code = contains_spec_code_shape(&normalized)?;
            // spacing kept so "12J2 1200" splits after "12J2", not after "12J212"
            let trailing = split_spec_code_shape(&fragment.text.to_uppercase())
                .map(|(_, trailing)| normalize_code_text(trailing))
                .unwrap_or_default();
            Some(Anchor {
                index,
                code: code.to_string(),
                trailing,
            })
        })
        .collect()
}

fn collect_candidates(
    fragments: &[TextFragment],
    anchor: &Anchor,
    config: &PageCodeConfig,
    geometry: &GeometryCalculator,
) -> Vec<Candidate> {
    let anchor_fragment = &fragments[anchor.index];
    let same_run = same_run_page(anchor)
        .filter(|page| accepts_page(page, anchor_fragment.confidence, config))
        .map(|page| Candidate {
            index: anchor.index,
            page,
            confidence: anchor_fragment.confidence,
            score: anchor_fragment.confidence / config.score_epsilon,
            center: anchor_fragment.center(),
        });

    let neighbors = geometry
        .find_neighbors(fragments, anchor.index, Some(config.search_radius))
        .into_iter()
        .filter_map(|relation| {
            let fragment = &fragments[relation.target_index];
            let page = fragment.normalized_text();
            accepts_page(&page, fragment.confidence, config).then(|| Candidate {
                index: relation.target_index,
                page,
                confidence: fragment.confidence,
                score: fragment.confidence / (relation.distance + config.score_epsilon),
                center: fragment.center(),
            })
        });

    same_run.into_iter().chain(neighbors).collect()
}

/// Page code written in the anchor's own run after the spec code, e.g. `12J2 C11` or
/// `12J2-C11`.
fn same_run_page(anchor: &Anchor) -> Option<String> {
    let page = anchor.trailing.trim_start_matches(is_run_separator);
    (!page.is_empty()).then(|| page.to_string())
}

fn is_run_separator(character: char) -> bool {
    matches!(
        character,
        '-' | '/' | '\\' | ',' | '.' | ':' | ';' | '_' | '|' | '·' | '，' | '：' | '、'
    )
}

fn accepts_page(page: &str, confidence: f64, config: &PageCodeConfig) -> bool {
    if !is_page_code_shape(page) || contains_spec_code_shape(page).is_some() {
        return false;
    }
    if page.chars().all(|character| character.is_ascii_digit())
        && page.len() > config.max_numeric_digits
    {
        return false;
    }
    confidence >= config.min_candidate_confidence
}

/// Best candidate by score, unless the top two are stacked vertically, in which case
/// the lower one (the bottom half of a split-circle mark) wins.
fn choose_candidate(mut candidates: Vec<Candidate>, config: &PageCodeConfig) -> Option<Candidate> {
    candidates.sort_by(|left, right| right.score.total_cmp(&left.score));
    candidates.truncate(2);

    if let [first, second] = candidates.as_slice() {
        if is_vertical_stack(first, second, config) {
            let lower = if second.center.1 > first.center.1 {
                second
            } else {
                first
            };
            debug!(page = %lower.page, "split-circle layout detected");
            return Some(lower.clone());
        }
    }

    candidates.into_iter().next()
}

fn is_vertical_stack(first: &Candidate, second: &Candidate, config: &PageCodeConfig) -> bool {
    let dx = (first.center.0 - second.center.0).abs();
    let dy = (first.center.1 - second.center.1).abs();
    dx < config.stack_max_dx && dy > config.stack_min_dy
}

fn deduplicate_pages(pages: Vec<PageCode>) -> Vec<PageCode> {
    let mut unique: Vec<PageCode> = Vec::with_capacity(pages.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for page in pages {
        match positions.get(&page.page) {
            Some(&position) => {
                if page.confidence > unique[position].confidence {
                    unique[position] = page;
                }
            }
            None => {
                positions.insert(page.page.clone(), unique.len());
                unique.push(page);
            }
        }
    }

    unique
}
