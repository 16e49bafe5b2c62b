use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub geometry: GeometryConfig,
    pub page: PageCodeConfig,
    pub confidence: ConfidenceConfig,
    pub max_candidates: usize,
    pub ocr_confidence_threshold: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig::default(),
            page: PageCodeConfig::default(),
            confidence: ConfidenceConfig::default(),
            max_candidates: 5,
            ocr_confidence_threshold: 0.6,
        }
    }
}

impl LocatorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub max_distance: f64,
    pub align_tolerance: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            max_distance: 300.0,
            align_tolerance: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageCodeConfig {
    pub search_radius: f64,
    pub min_candidate_confidence: f64,
    pub max_numeric_digits: usize,
    pub score_epsilon: f64,
    // split circle: |dx| < stack_max_dx and |dy| > stack_min_dy
    pub stack_max_dx: f64,
    pub stack_min_dy: f64,
    pub legacy_min_confidence: f64,
}

impl Default for PageCodeConfig {
    fn default() -> Self {
        Self {
            search_radius: 150.0,
            min_candidate_confidence: 0.5,
            max_numeric_digits: 3,
            score_epsilon: 1.0,
            stack_max_dx: 18.0,
            stack_min_dy: 25.0,
            legacy_min_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub ocr_weight: f64,
    pub geometry_weight: f64,
    pub pattern_weight: f64,
    pub min_confidence: f64,
    pub adjacent_geometry_score: f64,
    pub distant_geometry_score: f64,
    pub adjacency_window: usize,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            ocr_weight: 0.5,
            geometry_weight: 0.3,
            pattern_weight: 0.2,
            min_confidence: 0.1,
            adjacent_geometry_score: 1.0,
            distant_geometry_score: 0.3,
            adjacency_window: 2,
        }
    }
}
