use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::fragment::TextFragment;

/// Anything that can hand the pipeline a list of recognized fragments.
pub trait FragmentSource {
    fn fragments(&self) -> Result<Vec<TextFragment>>;
}

/// An OCR engine recognizing the fragments of one image.
pub trait OcrEngine {
    fn recognize(&self, image: &Path) -> Result<Vec<TextFragment>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OcrDump {
    Bare(Vec<TextFragment>),
    Wrapped { fragments: Vec<TextFragment> },
}

/// Accepts either a bare fragment array or `{ "fragments": [...] }`.
pub fn parse_ocr_dump(raw: &[u8]) -> Result<Vec<TextFragment>> {
    let dump: OcrDump = serde_json::from_slice(raw).context("failed to parse OCR dump")?;
    Ok(match dump {
        OcrDump::Bare(fragments) | OcrDump::Wrapped { fragments } => fragments,
    })
}

#[derive(Debug, Clone)]
pub struct JsonFragmentSource {
    path: PathBuf,
}

impl JsonFragmentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FragmentSource for JsonFragmentSource {
    fn fragments(&self) -> Result<Vec<TextFragment>> {
        let raw = fs::read(&self.path)
            .with_context(|| format!("failed to read OCR dump: {}", self.path.display()))?;
        let fragments = parse_ocr_dump(&raw)
            .with_context(|| format!("invalid OCR dump: {}", self.path.display()))?;
        info!(
            path = %self.path.display(),
            fragments = fragments.len(),
            "loaded OCR fragments"
        );
        Ok(fragments)
    }
}

type EngineInit<E> = Box<dyn Fn() -> Result<E> + Send + Sync>;

/// Engine handle that loads the engine on first use and shares it afterwards.
/// Passed explicitly to whoever needs it. A failed load leaves the handle empty so the
/// next caller retries.
pub struct LazyEngine<E> {
    engine: OnceLock<E>,
    init_lock: Mutex<()>,
    init: EngineInit<E>,
}

impl<E> LazyEngine<E> {
    pub fn new(init: impl Fn() -> Result<E> + Send + Sync + 'static) -> Self {
        Self {
            engine: OnceLock::new(),
            init_lock: Mutex::new(()),
            init: Box::new(init),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.get().is_some()
    }

    pub fn get(&self) -> Result<&E> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }

        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }

        info!("initializing OCR engine");
        let engine = (self.init)().context("failed to initialize OCR engine")?;
        Ok(self.engine.get_or_init(|| engine))
    }
}

/// Fragments of one image, recognized through a shared lazily-loaded engine.
pub struct EngineFragmentSource<'a, E> {
    engine: &'a LazyEngine<E>,
    image: PathBuf,
}

impl<'a, E> EngineFragmentSource<'a, E> {
    pub fn new(engine: &'a LazyEngine<E>, image: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            image: image.into(),
        }
    }
}

impl<E: OcrEngine> FragmentSource for EngineFragmentSource<'_, E> {
    fn fragments(&self) -> Result<Vec<TextFragment>> {
        self.engine
            .get()?
            .recognize(&self.image)
            .with_context(|| format!("OCR failed for {}", self.image.display()))
    }
}
