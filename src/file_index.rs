use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::fragment::normalize_code_text;

/// Directories that have already been through recognition carry this prefix.
pub const PROCESSED_DIR_PREFIX: &str = "已识别_";

static DIR_SPEC_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{2,3}[A-Z]+\d{1,4}(?:-\d+)?)").expect("valid directory spec regex")
});

/// Tried in order against the file stem; the first match wins.
static FILE_PAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)_([A-Z]\d+(?:-\d+)?)",
        r"_(\d+-\d+)",
        r"(?i)_([A-Z]+\d+)",
        r"_(\d+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid page filename regex"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecFile {
    pub spec_code: String,
    pub page_code: String,
    pub file_path: PathBuf,
    pub file_name: String,
    pub directory: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub spec_code_count: usize,
    pub total_file_count: usize,
}

/// Spec code -> page files, built from a `<data_dir>/<spec dir>/<spec>_<page>.pdf` tree.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    data_dir: PathBuf,
    entries: BTreeMap<String, Vec<SpecFile>>,
}

impl FileIndex {
    pub fn empty(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    pub fn build(data_dir: &Path) -> Result<Self> {
        let mut index = Self::empty(data_dir);

        if !data_dir.exists() {
            warn!(data_dir = %data_dir.display(), "data directory not found; index is empty");
            return Ok(index);
        }

        for dir_path in discover_spec_dirs(data_dir)? {
            let dir_name = dir_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let Some(spec_code) = spec_code_from_dir_name(&dir_name) else {
                warn!(directory = %dir_name, "directory name has no spec code; skipped");
                continue;
            };

            let files = scan_spec_dir(&dir_path, &dir_name, &spec_code)?;
            debug!(directory = %dir_name, spec = %spec_code, files = files.len(), "indexed directory");
            index.entries.entry(spec_code).or_default().extend(files);
        }

        for files in index.entries.values_mut() {
            files.sort_by(|a, b| {
                a.file_name
                    .cmp(&b.file_name)
                    .then_with(|| a.file_path.cmp(&b.file_path))
            });
        }
        index.entries.retain(|_, files| !files.is_empty());

        let stats = index.get_stats();
        info!(
            data_dir = %data_dir.display(),
            spec_codes = stats.spec_code_count,
            files = stats.total_file_count,
            "file index built"
        );
        Ok(index)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Exact spec key first, then any key that contains or is contained in the query.
    pub fn find_file(&self, spec_code: &str, page_code: &str) -> Option<&SpecFile> {
        let spec = normalize_code_text(spec_code);
        let page = page_code.trim();
        if spec.is_empty() || page.is_empty() {
            return None;
        }

        if let Some(found) = self
            .entries
            .get(&spec)
            .and_then(|files| find_page(files, page))
        {
            info!(spec = %spec, page, file = %found.file_name, "found exact match");
            return Some(found);
        }

        for (indexed, files) in &self.entries {
            if !indexed.contains(&spec) && !spec.contains(indexed.as_str()) {
                continue;
            }
            if let Some(found) = find_page(files, page) {
                info!(
                    spec = %spec,
                    indexed = %indexed,
                    page,
                    file = %found.file_name,
                    "found fuzzy match"
                );
                return Some(found);
            }
        }

        warn!(spec = %spec, page, "no file found");
        None
    }

    pub fn get_stats(&self) -> IndexStats {
        IndexStats {
            spec_code_count: self.entries.len(),
            total_file_count: self.entries.values().map(Vec::len).sum(),
        }
    }

    pub fn spec_codes(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn spec_files(&self, spec_code: &str) -> &[SpecFile] {
        self.entries
            .get(&normalize_code_text(spec_code))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn entries(&self) -> impl Iterator<Item = &SpecFile> {
        self.entries.values().flatten()
    }

    /// Hash of every (spec, page, directory, file) row in index order. Equal for two
    /// builds over an unchanged tree.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for file in self.entries() {
            hasher.update(file.spec_code.as_bytes());
            hasher.update(b"\t");
            hasher.update(file.page_code.as_bytes());
            hasher.update(b"\t");
            hasher.update(file.directory.as_bytes());
            hasher.update(b"\t");
            hasher.update(file.file_name.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Index handle that readers can hold across a rebuild. A rebuild swaps in a new
/// `Arc<FileIndex>`; the old one stays valid for whoever still holds it.
#[derive(Debug)]
pub struct SharedFileIndex {
    current: RwLock<Arc<FileIndex>>,
}

impl SharedFileIndex {
    pub fn new(index: FileIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn current(&self) -> Arc<FileIndex> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Rebuild from the current index's data directory. On failure the previous index
    /// stays in place.
    pub fn rebuild(&self) -> Result<IndexStats> {
        let data_dir = self.current().data_dir().to_path_buf();
        let fresh = FileIndex::build(&data_dir)
            .with_context(|| format!("failed to rebuild file index: {}", data_dir.display()))?;
        let stats = fresh.get_stats();

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(fresh);
        info!(
            spec_codes = stats.spec_code_count,
            files = stats.total_file_count,
            "file index swapped"
        );
        Ok(stats)
    }
}

pub fn spec_code_from_dir_name(dir_name: &str) -> Option<String> {
    let stripped = dir_name
        .strip_prefix(PROCESSED_DIR_PREFIX)
        .unwrap_or(dir_name);
    DIR_SPEC_CODE
        .captures(stripped)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_uppercase())
}

pub fn page_code_from_file_stem(stem: &str) -> Option<String> {
    FILE_PAGE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(stem)
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str().to_uppercase())
    })
}

pub fn page_matches(indexed: &str, query: &str) -> bool {
    indexed.eq_ignore_ascii_case(query)
        || indexed
            .trim_start_matches('0')
            .eq_ignore_ascii_case(query.trim_start_matches('0'))
}

fn find_page<'a>(files: &'a [SpecFile], page: &str) -> Option<&'a SpecFile> {
    files.iter().find(|file| page_matches(&file.page_code, page))
}

fn discover_spec_dirs(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();

    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("failed to read {}", data_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", data_dir.display()))?;
        let path = entry.path();

        if entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_dir()
        {
            dirs.push(path);
        }
    }

    dirs.sort();
    Ok(dirs)
}

fn scan_spec_dir(dir_path: &Path, dir_name: &str, spec_code: &str) -> Result<Vec<SpecFile>> {
    let mut files = Vec::new();

    let entries = fs::read_dir(dir_path)
        .with_context(|| format!("failed to read {}", dir_path.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", dir_path.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf {
            continue;
        }

        let (Some(file_name), Some(stem)) = (
            path.file_name().and_then(|name| name.to_str()),
            path.file_stem().and_then(|stem| stem.to_str()),
        ) else {
            warn!(path = %path.display(), "skipping non UTF-8 filename");
            continue;
        };

        let Some(page_code) = page_code_from_file_stem(stem) else {
            debug!(file = file_name, "filename has no page code; skipped");
            continue;
        };

        files.push(SpecFile {
            spec_code: spec_code.to_string(),
            page_code,
            file_name: file_name.to_string(),
            directory: dir_name.to_string(),
            file_path: path,
        });
    }

    Ok(files)
}
