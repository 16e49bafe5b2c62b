use std::path::PathBuf;

use anyhow::Result;
use spec_locator::file_index::FileIndex;
use spec_locator::model::IndexManifest;
use tracing::info;

use crate::cli::IndexArgs;
use crate::util::{now_utc_string, write_json_pretty};

const DEFAULT_MANIFEST_PATH: &str = ".cache/spec-locator/index_manifest.json";

pub fn run(args: IndexArgs) -> Result<()> {
    let index = FileIndex::build(&args.data_dir)?;
    let manifest = IndexManifest::from_index(&index, now_utc_string());

    if args.dry_run {
        info!(
            spec_codes = manifest.stats.spec_code_count,
            files = manifest.stats.total_file_count,
            fingerprint = %manifest.fingerprint,
            data_dir = %manifest.data_dir,
            "index dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_PATH));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote index manifest");
    info!(
        spec_codes = manifest.stats.spec_code_count,
        files = manifest.stats.total_file_count,
        "index completed"
    );

    Ok(())
}
