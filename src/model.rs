use serde::{Deserialize, Serialize};

use crate::confidence::SpecMatch;
use crate::file_index::{FileIndex, IndexStats, SpecFile};
use crate::pipeline::{Diagnostics, ErrorCode, LocateOutcome};
use crate::vision::ResultSource;

pub const INDEX_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub data_dir: String,
    pub stats: IndexStats,
    pub fingerprint: String,
    pub entries: Vec<SpecFile>,
}

impl IndexManifest {
    pub fn from_index(index: &FileIndex, generated_at: String) -> Self {
        Self {
            manifest_version: INDEX_MANIFEST_VERSION,
            generated_at,
            data_dir: index.data_dir().display().to_string(),
            stats: index.get_stats(),
            fingerprint: index.fingerprint(),
            entries: index.entries().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub code: String,
    pub page: String,
    pub confidence: f64,
}

impl From<&SpecMatch> for MatchSummary {
    fn from(found: &SpecMatch) -> Self {
        Self {
            code: found.spec_code.clone(),
            page: found.page_code.clone(),
            confidence: round4(found.confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub name: String,
    pub directory: String,
}

impl From<&SpecFile> for FileSummary {
    fn from(file: &SpecFile) -> Self {
        Self {
            path: file.file_path.display().to_string(),
            name: file.file_name.clone(),
            directory: file.directory.clone(),
        }
    }
}

/// JSON shape of a `locate` answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<MatchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<MatchSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResultSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl From<&LocateOutcome> for LocateResponse {
    fn from(outcome: &LocateOutcome) -> Self {
        let error_code = outcome.error_code();
        let message = error_code.map(|code| code.message().to_string());

        match outcome {
            LocateOutcome::Failed { diagnostics, .. } => Self {
                success: false,
                error_code,
                message,
                spec: None,
                candidates: None,
                source: None,
                file: None,
                diagnostics: diagnostics.clone(),
            },
            LocateOutcome::FileNotIndexed {
                best,
                candidates,
                source,
                diagnostics,
            } => Self {
                success: false,
                error_code,
                message,
                spec: Some(best.into()),
                candidates: Some(candidates.iter().map(MatchSummary::from).collect()),
                source: Some(*source),
                file: None,
                diagnostics: diagnostics.clone(),
            },
            LocateOutcome::Found {
                best,
                candidates,
                source,
                file,
            } => Self {
                success: true,
                error_code: None,
                message: None,
                spec: Some(best.into()),
                candidates: Some(candidates.iter().map(MatchSummary::from).collect()),
                source: Some(*source),
                file: Some(file.into()),
                diagnostics: None,
            },
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
