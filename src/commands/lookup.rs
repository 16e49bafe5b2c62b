use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use spec_locator::file_index::FileIndex;
use tracing::warn;

use crate::cli::LookupArgs;

pub fn run(args: LookupArgs) -> Result<()> {
    let index = FileIndex::build(&args.data_dir)?;

    let Some(file) = index.find_file(&args.spec, &args.page) else {
        let pages = index
            .spec_files(&args.spec)
            .iter()
            .map(|file| file.page_code.as_str())
            .collect::<Vec<_>>();
        if !pages.is_empty() {
            warn!(spec = %args.spec, pages = %pages.join(","), "indexed pages for spec");
        }
        bail!("no file indexed for {} page {}", args.spec, args.page);
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, file)
            .context("failed to serialize lookup json output")?;
        writeln!(output)?;
    } else {
        writeln!(output, "Spec: {} page {}", file.spec_code, file.page_code)?;
        writeln!(output, "Directory: {}", file.directory)?;
        writeln!(output, "File: {}", file.file_path.display())?;
    }
    output.flush()?;
    Ok(())
}
