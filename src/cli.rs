use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "ragdata",
    version,
    about = "Maintenance tooling for the RAG QA logs & corpus dataset"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check primary keys, foreign keys, enums, and ranges across all tables
    Validate(ValidateArgs),
    /// Build the denormalized one-row-per-retrieval-event analytics table
    Flatten(FlattenArgs),
    /// Draw a referentially closed random sub-sample of the dataset
    Sample(SampleArgs),
    /// Write a dataset statistics report
    Summarize(SummarizeArgs),
    /// Copy the canonical data dictionary into docs/
    SyncDictionary(SyncDictionaryArgs),
    /// Write or verify the SHA-256 checksum manifest
    Checksums(ChecksumsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Auto,
    Parquet,
    Csv,
}

#[derive(Args, Debug, Clone)]
pub struct FlattenArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "data/derived/flat_rag_events.parquet")]
    pub out: PathBuf,

    /// auto = parquet when the columnar writer is compiled in, else csv
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct SampleArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "data/sample")]
    pub out: PathBuf,

    #[arg(long, default_value_t = 5000)]
    pub n_events: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Debug, Clone)]
pub struct SummarizeArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "docs/dataset_stats.md")]
    pub out: PathBuf,

    /// Also write the report as a JSON manifest
    #[arg(long)]
    pub json_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SyncDictionaryArgs {
    #[arg(long, default_value = ".")]
    pub repo_root: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ChecksumsArgs {
    #[arg(long, default_value = ".")]
    pub repo_root: PathBuf,

    /// Verify the existing manifest instead of rewriting it
    #[arg(long, default_value_t = false)]
    pub check: bool,
}
