use std::fs;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::SyncDictionaryArgs;
use crate::util::ensure_directory;

pub const DICTIONARY_FILE: &str = "data_dictionary.csv";

/// The root copy is canonical for distribution; docs/ holds a browsing copy
/// kept byte-identical by this command.
pub fn run(args: SyncDictionaryArgs) -> Result<()> {
    let canonical = args.repo_root.join(DICTIONARY_FILE);
    let docs_copy = args.repo_root.join("docs").join(DICTIONARY_FILE);

    if !canonical.is_file() {
        bail!("canonical data dictionary not found: {}", canonical.display());
    }

    if let Some(parent) = docs_copy.parent() {
        ensure_directory(parent)?;
    }
    fs::copy(&canonical, &docs_copy).with_context(|| {
        format!(
            "failed to copy {} to {}",
            canonical.display(),
            docs_copy.display()
        )
    })?;

    info!(from = %canonical.display(), to = %docs_copy.display(), "synced data dictionary");

    Ok(())
}
