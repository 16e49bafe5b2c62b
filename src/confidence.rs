use serde::Serialize;
use tracing::{debug, info};

use crate::config::ConfidenceConfig;
use crate::fragment::clamp_unit;
use crate::parser::{PageCode, SpecCode};

const SHARED_SOURCE_BONUS: f64 = 0.5;
const DASHED_PAGE_BONUS: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecMatch {
    pub spec_code: String,
    pub page_code: String,
    pub confidence: f64,
    pub spec_confidence: f64,
    pub page_confidence: f64,
}

/// Pairs every spec code with every page code and ranks the pairings.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceEvaluator {
    config: ConfidenceConfig,
}

impl ConfidenceEvaluator {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfidenceConfig {
        &self.config
    }

    pub fn evaluate(&self, spec_codes: &[SpecCode], page_codes: &[PageCode]) -> Vec<SpecMatch> {
        let mut matches = Vec::with_capacity(spec_codes.len() * page_codes.len());

        for spec in spec_codes {
            for page in page_codes {
                let confidence = self.score(spec, page);
                if confidence < self.config.min_confidence {
                    debug!(
                        spec = %spec.code,
                        page = %page.page,
                        confidence,
                        "pairing below minimum confidence"
                    );
                    continue;
                }

                matches.push(SpecMatch {
                    spec_code: spec.code.clone(),
                    page_code: page.page.clone(),
                    confidence,
                    spec_confidence: spec.confidence,
                    page_confidence: page.confidence,
                });
            }
        }

        // stable: ties keep spec-major input order
        matches.sort_by(|left, right| right.confidence.total_cmp(&left.confidence));

        info!(
            spec_codes = spec_codes.len(),
            page_codes = page_codes.len(),
            matches = matches.len(),
            "evaluated candidate pairings"
        );
        matches
    }

    pub fn score(&self, spec: &SpecCode, page: &PageCode) -> f64 {
        let config = &self.config;
        let ocr = (spec.confidence + page.confidence) / 2.0;
        let total = config.ocr_weight * ocr
            + config.geometry_weight * self.geometry_score(spec, page)
            + self.pattern_bonus(spec, page);
        clamp_unit(total)
    }

    fn geometry_score(&self, spec: &SpecCode, page: &PageCode) -> f64 {
        let adjacent = page
            .source_indices
            .iter()
            .any(|index| index.abs_diff(spec.source_index) <= self.config.adjacency_window);
        if adjacent {
            self.config.adjacent_geometry_score
        } else {
            self.config.distant_geometry_score
        }
    }

    fn pattern_bonus(&self, spec: &SpecCode, page: &PageCode) -> f64 {
        let weight = self.config.pattern_weight;
        let mut bonus = 0.0;
        if page.source_indices.contains(&spec.source_index) {
            bonus += weight * SHARED_SOURCE_BONUS;
        }
        if page.page.contains('-') {
            bonus += weight * DASHED_PAGE_BONUS;
        }
        bonus.min(weight)
    }
}

pub fn top_n(matches: &[SpecMatch], n: usize) -> Vec<SpecMatch> {
    matches.iter().take(n).cloned().collect()
}

pub fn best_match(matches: &[SpecMatch]) -> Option<&SpecMatch> {
    matches.first()
}

pub fn filter_by_confidence(matches: &[SpecMatch], min_confidence: f64) -> Vec<SpecMatch> {
    matches
        .iter()
        .filter(|found| found.confidence >= min_confidence)
        .cloned()
        .collect()
}
