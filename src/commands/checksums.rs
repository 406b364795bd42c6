use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::ChecksumsArgs;
use crate::util::sha256_file;

pub const MANIFEST_FILE: &str = "checksums.sha256";

/// Directories scanned for .csv files, plus fixed root-level assets.
const CSV_DIRS: [&str; 2] = ["data", "docs"];
const ROOT_FILES: [&str; 5] = [
    "data_dictionary.csv",
    "README.md",
    "LICENSE",
    "CITATION.cff",
    "CHANGELOG.md",
];

pub fn run(args: ChecksumsArgs) -> Result<()> {
    let manifest_path = args.repo_root.join(MANIFEST_FILE);
    let content = build_manifest(&args.repo_root)?;

    if args.check {
        if !manifest_path.is_file() {
            bail!("{MANIFEST_FILE} is missing; generate it with: ragdata checksums");
        }
        let existing = fs::read_to_string(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        if existing != content {
            bail!("{MANIFEST_FILE} does not match current files; re-generate with: ragdata checksums");
        }
        info!(path = %manifest_path.display(), "checksum manifest OK");
        return Ok(());
    }

    fs::write(&manifest_path, &content)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    info!(
        path = %manifest_path.display(),
        entries = content.lines().count(),
        "wrote checksum manifest"
    );

    Ok(())
}

/// Renders the manifest: one `{digest}  {relative path}` line per covered
/// file, sorted case-insensitively by path, with a trailing newline.
pub fn build_manifest(repo_root: &Path) -> Result<String> {
    let mut rel_paths = target_files(repo_root)?;
    rel_paths.sort_by_key(|path| path.to_lowercase());

    let mut lines = Vec::with_capacity(rel_paths.len());
    for rel_path in &rel_paths {
        let digest = sha256_file(&repo_root.join(rel_path))?;
        lines.push(format!("{digest}  {rel_path}"));
    }

    Ok(lines.join("\n") + "\n")
}

fn target_files(repo_root: &Path) -> Result<Vec<String>> {
    let mut rel_paths = Vec::new();

    for dir in CSV_DIRS {
        let dir_path = repo_root.join(dir);
        if !dir_path.is_dir() {
            continue;
        }
        let entries = fs::read_dir(&dir_path)
            .with_context(|| format!("failed to read {}", dir_path.display()))?;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", dir_path.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if is_csv {
                rel_paths.push(format!("{dir}/{file_name}"));
            }
        }
    }

    for name in ROOT_FILES {
        if repo_root.join(name).is_file() {
            rel_paths.push(name.to_string());
        }
    }

    Ok(rel_paths)
}

#[cfg(test)]
mod tests {
    use super::{MANIFEST_FILE, build_manifest, run};
    use crate::cli::ChecksumsArgs;

    fn fixture_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        std::fs::create_dir(dir.path().join("data")).expect("data dir");
        std::fs::write(dir.path().join("data").join("events.csv"), "run_id\nr1\n")
            .expect("fixture write");
        std::fs::write(dir.path().join("data").join("Docs.csv"), "doc_id\nd1\n")
            .expect("fixture write");
        std::fs::write(dir.path().join("data").join("notes.txt"), "not covered")
            .expect("fixture write");
        std::fs::write(dir.path().join("README.md"), "# fixture\n").expect("fixture write");
        dir
    }

    fn args(root: &tempfile::TempDir, check: bool) -> ChecksumsArgs {
        ChecksumsArgs {
            repo_root: root.path().to_path_buf(),
            check,
        }
    }

    #[test]
    fn manifest_is_sorted_case_insensitively_with_trailing_newline() {
        let root = fixture_root();
        let content = build_manifest(root.path()).expect("manifest should build");

        let lines = content.lines().collect::<Vec<&str>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("data/Docs.csv"), "unexpected order: {lines:?}");
        assert!(lines[1].ends_with("data/events.csv"), "unexpected order: {lines:?}");
        assert!(lines[2].ends_with("README.md"), "unexpected order: {lines:?}");
        assert!(content.ends_with('\n'));
        assert!(!content.contains("notes.txt"));
    }

    #[test]
    fn manifest_lines_carry_hex_digest_and_two_space_separator() {
        let root = fixture_root();
        let content = build_manifest(root.path()).expect("manifest should build");

        let first = content.lines().next().expect("at least one line");
        let (digest, rest) = first.split_at(64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(rest.starts_with("  "));
    }

    #[test]
    fn write_then_check_round_trips() {
        let root = fixture_root();
        run(args(&root, false)).expect("write should succeed");
        run(args(&root, true)).expect("fresh manifest should verify");
    }

    #[test]
    fn mutating_a_covered_file_fails_the_check() {
        let root = fixture_root();
        run(args(&root, false)).expect("write should succeed");

        std::fs::write(root.path().join("data").join("events.csv"), "run_id\nr2\n")
            .expect("mutation write");
        let error = run(args(&root, true)).expect_err("stale manifest should fail");
        assert!(error.to_string().contains("does not match"));
    }

    #[test]
    fn check_without_a_manifest_fails_distinctly() {
        let root = fixture_root();
        let error = run(args(&root, true)).expect_err("missing manifest should fail");
        assert!(error.to_string().contains(MANIFEST_FILE));
        assert!(error.to_string().contains("missing"));
    }
}
