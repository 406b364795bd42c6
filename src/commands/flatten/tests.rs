use super::{build_flat_table, cost_bucket, latency_bucket, left_join_many_to_one};
use crate::dataset::Dataset;
use crate::table::Table;

fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
    let mut table = Table::new(name, columns.to_vec());
    for row in rows {
        assert_eq!(row.len(), columns.len(), "fixture row width mismatch");
        table.push_row(
            row.iter()
                .map(|value| {
                    if value.is_empty() {
                        None
                    } else {
                        Some(value.to_string())
                    }
                })
                .collect(),
        );
    }
    table
}

fn mini_dataset() -> Dataset {
    Dataset {
        documents: table("rag_corpus_documents", &["doc_id", "source"], &[
            &["d1", "wiki"],
            &["d2", "pdf"],
        ]),
        chunks: table("rag_corpus_chunks", &["chunk_id", "doc_id", "chunk_text"], &[
            &["c1", "d1", "alpha"],
            &["c2", "d2", "beta"],
        ]),
        runs: table(
            "rag_qa_eval_runs",
            &["run_id", "scenario_id", "total_latency_ms", "total_cost_usd"],
            &[&["r1", "s1", "250", "0.02"], &["r2", "s2", "6000", ""]],
        ),
        scenarios: table("rag_qa_scenarios", &["scenario_id", "domain"], &[
            &["s1", "legal"],
            &["s2", "medical"],
        ]),
        events: table(
            "rag_retrieval_events",
            &["run_id", "chunk_id", "rank", "scenario_id"],
            &[
                &["r1", "c1", "1", "s1"],
                &["r1", "c2", "2", "s1"],
                &["r2", "c2", "1", "s2"],
            ],
        ),
    }
}

#[test]
fn flat_table_keeps_one_row_per_event() {
    let dataset = mini_dataset();
    let flat = build_flat_table(&dataset).expect("flat table should build");
    assert_eq!(flat.len(), dataset.events.len());
}

#[test]
fn ancestor_attributes_are_attached() {
    let dataset = mini_dataset();
    let flat = build_flat_table(&dataset).expect("flat table should build");

    assert_eq!(flat.get(0, "chunk_text"), Some("alpha"));
    assert_eq!(flat.get(0, "source"), Some("wiki"));
    assert_eq!(flat.get(0, "domain"), Some("legal"));
    assert_eq!(flat.get(2, "total_latency_ms"), Some("6000"));
}

#[test]
fn colliding_columns_get_the_losing_table_suffix() {
    let dataset = mini_dataset();
    let flat = build_flat_table(&dataset).expect("flat table should build");

    // events carry scenario_id, so the run-level copy is renamed
    assert!(flat.has_column("scenario_id"));
    assert!(flat.has_column("scenario_id_run"));
    assert_eq!(flat.get(0, "scenario_id_run"), Some("s1"));
}

#[test]
fn unmatched_event_rows_survive_with_missing_attributes() {
    let mut dataset = mini_dataset();
    dataset.events = table(
        "rag_retrieval_events",
        &["run_id", "chunk_id", "rank", "scenario_id"],
        &[&["r9", "c1", "1", ""]],
    );

    let flat = build_flat_table(&dataset).expect("flat table should build");
    assert_eq!(flat.len(), 1);
    assert_eq!(flat.get(0, "chunk_text"), Some("alpha"));
    assert_eq!(flat.get(0, "total_latency_ms"), None);
}

#[test]
fn one_to_many_parent_fails_loudly() {
    let mut dataset = mini_dataset();
    dataset.runs = table("rag_qa_eval_runs", &["run_id", "scenario_id"], &[
        &["r1", "s1"],
        &["r1", "s2"],
    ]);

    let error = build_flat_table(&dataset).expect_err("duplicate run_id should fail");
    let message = error.to_string();
    assert!(message.contains("not unique"), "unexpected message: {message}");
    assert!(message.contains("r1"), "unexpected message: {message}");
}

#[test]
fn derived_buckets_are_appended_per_row() {
    let dataset = mini_dataset();
    let flat = build_flat_table(&dataset).expect("flat table should build");

    assert_eq!(flat.get(0, "latency_bucket"), Some("<=250"));
    assert_eq!(flat.get(2, "latency_bucket"), Some(">5000"));
    assert_eq!(flat.get(0, "cost_bucket"), Some("0.01-0.05"));
    // r2 has no cost value, so its rows carry no bucket
    assert_eq!(flat.get(2, "cost_bucket"), None);
}

#[test]
fn latency_bucket_edges_are_inclusive_on_the_right() {
    assert_eq!(latency_bucket(250.0), Some("<=250"));
    assert_eq!(latency_bucket(250.01), Some("251-500"));
    assert_eq!(latency_bucket(0.0), Some("<=250"));
    assert_eq!(latency_bucket(999_999.0), Some(">5000"));
    assert_eq!(latency_bucket(-0.5), None);
}

#[test]
fn cost_bucket_edges_are_inclusive_on_the_right() {
    assert_eq!(cost_bucket(0.0), Some("<=0.001"));
    assert_eq!(cost_bucket(0.001), Some("<=0.001"));
    assert_eq!(cost_bucket(0.0011), Some("0.001-0.01"));
    assert_eq!(cost_bucket(0.25), Some("0.1-0.25"));
    assert_eq!(cost_bucket(0.5), Some(">0.25"));
    assert_eq!(cost_bucket(-0.01), None);
}

#[test]
fn join_requires_the_key_on_both_sides() {
    let left = table("rag_retrieval_events", &["chunk_id"], &[&["c1"]]);
    let right = table("rag_qa_eval_runs", &["run_id"], &[&["r1"]]);

    let error =
        left_join_many_to_one(&left, &right, "run_id", "run").expect_err("missing key should fail");
    assert!(error.to_string().contains("join column 'run_id' is missing"));
}
