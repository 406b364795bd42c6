use std::path::Path;

use anyhow::{Result, bail};

use crate::table::Table;

pub const DOCUMENTS_FILE: &str = "rag_corpus_documents.csv";
pub const CHUNKS_FILE: &str = "rag_corpus_chunks.csv";
pub const RUNS_FILE: &str = "rag_qa_eval_runs.csv";
pub const SCENARIOS_FILE: &str = "rag_qa_scenarios.csv";
pub const EVENTS_FILE: &str = "rag_retrieval_events.csv";

/// Logical table name / file name pairs, in dependency order.
pub const TABLE_FILES: [(&str, &str); 5] = [
    ("rag_corpus_documents", DOCUMENTS_FILE),
    ("rag_corpus_chunks", CHUNKS_FILE),
    ("rag_qa_eval_runs", RUNS_FILE),
    ("rag_qa_scenarios", SCENARIOS_FILE),
    ("rag_retrieval_events", EVENTS_FILE),
];

pub struct Dataset {
    pub documents: Table,
    pub chunks: Table,
    pub runs: Table,
    pub scenarios: Table,
    pub events: Table,
}

impl Dataset {
    /// Loads all five tables from `data_dir`. A missing directory or file
    /// fails here, before any consumer logic runs.
    pub fn load(data_dir: &Path) -> Result<Dataset> {
        if !data_dir.is_dir() {
            bail!("data directory not found: {}", data_dir.display());
        }

        for (name, file) in TABLE_FILES {
            let path = data_dir.join(file);
            if !path.is_file() {
                bail!("missing required file for [{name}]: {}", path.display());
            }
        }

        Ok(Dataset {
            documents: Table::from_csv(&data_dir.join(DOCUMENTS_FILE), "rag_corpus_documents")?,
            chunks: Table::from_csv(&data_dir.join(CHUNKS_FILE), "rag_corpus_chunks")?,
            runs: Table::from_csv(&data_dir.join(RUNS_FILE), "rag_qa_eval_runs")?,
            scenarios: Table::from_csv(&data_dir.join(SCENARIOS_FILE), "rag_qa_scenarios")?,
            events: Table::from_csv(&data_dir.join(EVENTS_FILE), "rag_retrieval_events")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Dataset;

    #[test]
    fn load_fails_on_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let missing = dir.path().join("nope");

        let error = Dataset::load(&missing).expect_err("missing directory should fail");
        assert!(error.to_string().contains("data directory not found"));
    }

    #[test]
    fn load_fails_naming_the_first_missing_table() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        std::fs::write(dir.path().join("rag_corpus_documents.csv"), "doc_id\nd1\n")
            .expect("fixture write");

        let error = Dataset::load(dir.path()).expect_err("missing chunks file should fail");
        assert!(error.to_string().contains("[rag_corpus_chunks]"));
    }
}
