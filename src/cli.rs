use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "spec-locator",
    version,
    about = "Locate standard-document pages from recognized index marks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize an OCR dump and resolve it to a page file.
    Locate(LocateArgs),
    /// Build the file index and write its manifest.
    Index(IndexArgs),
    /// Look up a page file by spec code and page code.
    Lookup(LookupArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    /// OCR dump: a fragment array or `{ "fragments": [...] }`.
    #[arg(long)]
    pub fragments: PathBuf,

    #[arg(long, env = "SPEC_DATA_DIR", default_value = "output_pages")]
    pub data_dir: PathBuf,

    /// Raw response text from the vision recognizer, used when OCR is unsure.
    #[arg(long)]
    pub vision_response: Option<PathBuf>,

    /// JSON file overriding recognition constants.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub min_confidence: Option<f64>,

    #[arg(long)]
    pub search_radius: Option<f64>,

    #[arg(long)]
    pub max_candidates: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    #[arg(long, env = "SPEC_DATA_DIR", default_value = "output_pages")]
    pub data_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    #[arg(long, env = "SPEC_DATA_DIR", default_value = "output_pages")]
    pub data_dir: PathBuf,

    #[arg(long)]
    pub spec: String,

    #[arg(long)]
    pub page: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
