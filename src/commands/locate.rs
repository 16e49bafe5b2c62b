use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use spec_locator::config::LocatorConfig;
use spec_locator::file_index::FileIndex;
use spec_locator::model::LocateResponse;
use spec_locator::pipeline::{LocateOutcome, locate};
use spec_locator::source::{FragmentSource, JsonFragmentSource};
use spec_locator::vision::{VisionResult, parse_vision_response};
use tracing::info;

use crate::cli::LocateArgs;

pub fn run(args: LocateArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let fragments = JsonFragmentSource::new(&args.fragments).fragments()?;
    let vision = args
        .vision_response
        .as_deref()
        .map(read_vision_response)
        .transpose()?;
    let index = FileIndex::build(&args.data_dir)?;

    let outcome = locate(&fragments, &index, &config, vision.as_ref());
    info!(
        fragments = fragments.len(),
        error_code = outcome.error_code().map(|code| code.as_str()).unwrap_or("none"),
        "locate completed"
    );

    if args.json {
        write_json_response(&LocateResponse::from(&outcome))
    } else {
        write_text_response(&outcome)
    }
}

fn resolve_config(args: &LocateArgs) -> Result<LocatorConfig> {
    let mut config = match &args.config {
        Some(path) => LocatorConfig::load(path)?,
        None => LocatorConfig::default(),
    };

    if let Some(min_confidence) = args.min_confidence {
        config.confidence.min_confidence = min_confidence;
    }
    if let Some(search_radius) = args.search_radius {
        config.page.search_radius = search_radius;
    }
    if let Some(max_candidates) = args.max_candidates {
        config.max_candidates = max_candidates;
    }

    Ok(config)
}

fn read_vision_response(path: &Path) -> Result<VisionResult> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read vision response: {}", path.display()))?;
    Ok(parse_vision_response(&text))
}

fn write_json_response(response: &LocateResponse) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, response)
        .context("failed to serialize locate json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_response(outcome: &LocateOutcome) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    match outcome {
        LocateOutcome::Failed { error, diagnostics } => {
            writeln!(output, "Result: failed ({})", error.as_str())?;
            writeln!(output, "Message: {}", error.message())?;
            if let Some(diagnostics) = diagnostics {
                let specs = diagnostics
                    .spec_codes
                    .iter()
                    .map(|code| code.code.as_str())
                    .collect::<Vec<_>>();
                let pages = diagnostics
                    .page_codes
                    .iter()
                    .map(|code| code.page.as_str())
                    .collect::<Vec<_>>();
                writeln!(output, "Fragments: {}", diagnostics.fragment_texts.len())?;
                writeln!(output, "Spec codes seen: {}", specs.join(", "))?;
                writeln!(
                    output,
                    "Page codes seen: {} ({})",
                    pages.join(", "),
                    diagnostics.page_strategy.as_str()
                )?;
            }
        }
        LocateOutcome::FileNotIndexed {
            best,
            candidates,
            source,
            ..
        }
        | LocateOutcome::Found {
            best,
            candidates,
            source,
            ..
        } => {
            writeln!(
                output,
                "Spec: {} page {} confidence={:.4} source={}",
                best.spec_code,
                best.page_code,
                best.confidence,
                source.as_str()
            )?;
            match outcome {
                LocateOutcome::Found { file, .. } => {
                    writeln!(output, "File: {}", file.file_path.display())?;
                }
                _ => {
                    let code = outcome.error_code().map(|code| code.as_str());
                    writeln!(output, "File: not indexed ({})", code.unwrap_or("unknown"))?;
                }
            }
            writeln!(output, "Candidates: {}", candidates.len())?;
            for (rank, candidate) in candidates.iter().enumerate() {
                writeln!(
                    output,
                    "{}. {} / {}\tconfidence={:.4} (spec={:.2} page={:.2})",
                    rank + 1,
                    candidate.spec_code,
                    candidate.page_code,
                    candidate.confidence,
                    candidate.spec_confidence,
                    candidate.page_confidence,
                )?;
            }
        }
    }

    output.flush()?;
    Ok(())
}
