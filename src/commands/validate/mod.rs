use anyhow::Result;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::dataset::Dataset;

mod checks;

use self::checks::*;

/// Accepted renderings of boolean flags. The dataset ships both numeric and
/// string variants, so the permissive policy is canonical here.
const BOOLEAN_ALLOWED: [&str; 8] = ["0", "1", "true", "false", "True", "False", "TRUE", "FALSE"];

const SPLIT_ALLOWED: [&str; 4] = ["train", "val", "test", "validation"];

/// Boolean-flag columns per table, checked only when present.
const DOCUMENT_FLAG_COLUMNS: [&str; 2] = ["is_active", "contains_tables"];
const SCENARIO_FLAG_COLUMNS: [&str; 2] = ["has_answer_in_corpus", "is_used_in_eval"];
const RUN_FLAG_COLUMNS: [&str; 6] = [
    "is_correct",
    "has_answer_in_corpus",
    "is_noanswer_probe",
    "has_relevant_in_top5",
    "has_relevant_in_top10",
    "answered_without_retrieval",
];

/// Score/ratio columns on runs, constrained to [0, 1] when present.
const RUN_SCORE_COLUMNS: [&str; 3] = ["recall_at_k", "mrr_at_10", "faithfulness_score"];

pub fn run(args: ValidateArgs) -> Result<()> {
    let dataset = Dataset::load(&args.data_dir)?;
    validate_dataset(&dataset)?;

    info!(
        documents = dataset.documents.len(),
        chunks = dataset.chunks.len(),
        scenarios = dataset.scenarios.len(),
        runs = dataset.runs.len(),
        events = dataset.events.len(),
        "dataset validation passed"
    );

    Ok(())
}

/// Full validation plan. Every check raises on its first violation, so the
/// plan aborts at the first failing check.
pub fn validate_dataset(dataset: &Dataset) -> Result<()> {
    let Dataset {
        documents,
        chunks,
        runs,
        scenarios,
        events,
    } = dataset;

    // Key columns must exist before anything else is worth checking.
    require_columns(documents, &["doc_id"])?;
    require_columns(chunks, &["chunk_id", "doc_id"])?;
    require_columns(runs, &["run_id", "scenario_id"])?;
    require_columns(scenarios, &["scenario_id"])?;
    require_columns(events, &["run_id", "chunk_id", "rank"])?;

    // Primary keys.
    check_unique(documents, &["doc_id"])?;
    check_unique(chunks, &["chunk_id"])?;
    check_unique(runs, &["run_id"])?;
    check_unique(scenarios, &["scenario_id"])?;
    check_unique(events, &["run_id", "chunk_id", "rank"])?;

    check_not_null(documents, &["doc_id"])?;
    check_not_null(chunks, &["chunk_id"])?;
    check_not_null(runs, &["run_id"])?;
    check_not_null(scenarios, &["scenario_id"])?;
    check_not_null(events, &["run_id", "chunk_id", "rank"])?;

    // Foreign keys.
    check_foreign_key(chunks, "doc_id", documents, "doc_id")?;
    check_foreign_key(events, "chunk_id", chunks, "chunk_id")?;
    check_foreign_key(events, "run_id", runs, "run_id")?;
    check_foreign_key(runs, "scenario_id", scenarios, "scenario_id")?;
    if events.has_column("scenario_id") {
        check_foreign_key(events, "scenario_id", scenarios, "scenario_id")?;
    }

    for table in [events, runs, scenarios] {
        if table.has_column("split") {
            check_in_set(table, "split", &SPLIT_ALLOWED)?;
        }
    }

    check_range(events, "rank", Some(1.0), None)?;

    let flag_specs: [(&crate::table::Table, &[&str]); 4] = [
        (documents, &DOCUMENT_FLAG_COLUMNS),
        (scenarios, &SCENARIO_FLAG_COLUMNS),
        (runs, &RUN_FLAG_COLUMNS),
        (events, &["is_relevant"]),
    ];
    for (table, columns) in flag_specs {
        for column in columns {
            if table.has_column(column) {
                check_in_set(table, column, &BOOLEAN_ALLOWED)?;
            }
        }
    }

    for column in RUN_SCORE_COLUMNS {
        if runs.has_column(column) {
            check_range(runs, column, Some(0.0), Some(1.0))?;
        }
    }
    for column in ["total_latency_ms", "total_cost_usd"] {
        if runs.has_column(column) {
            check_range(runs, column, Some(0.0), None)?;
        }
    }

    if chunks.has_column("chunk_text") {
        check_non_empty(chunks, "chunk_text")?;
    }
    if scenarios.has_column("query") {
        check_non_empty(scenarios, "query")?;
    }

    Ok(())
}
