use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::SummarizeArgs;
use crate::dataset::Dataset;
use crate::model::{DatasetStatsReport, PercentileSummary, TableRowCounts, ValueCount};
use crate::table::{Table, parse_boolean, parse_number};
use crate::util::{ensure_directory, now_utc_string, write_json_pretty};

/// Rendering label for a missing categorical value.
const MISSING_LABEL: &str = "(missing)";

const TOP_DOMAINS: usize = 20;

pub fn run(args: SummarizeArgs) -> Result<()> {
    let dataset = Dataset::load(&args.data_dir)?;
    let report = build_report(&dataset);

    if let Some(parent) = args.out.parent() {
        ensure_directory(parent)?;
    }
    fs::write(&args.out, render_markdown(&report))
        .with_context(|| format!("failed to write stats report: {}", args.out.display()))?;
    info!(path = %args.out.display(), total_rows = report.total_rows, "wrote stats report");

    if let Some(json_out) = &args.json_out {
        write_json_pretty(json_out, &report)?;
        info!(path = %json_out.display(), "wrote stats manifest");
    }

    Ok(())
}

pub fn build_report(dataset: &Dataset) -> DatasetStatsReport {
    let table_rows = TableRowCounts {
        documents: dataset.documents.len(),
        chunks: dataset.chunks.len(),
        scenarios: dataset.scenarios.len(),
        runs: dataset.runs.len(),
        events: dataset.events.len(),
    };
    let total_rows = table_rows.total();

    let (relevance_at_5, relevance_at_10) = relevance_at_k(&dataset.events);

    DatasetStatsReport {
        manifest_version: 1,
        generated_at: now_utc_string(),
        total_rows,
        table_rows,
        accuracy: boolean_mean(&dataset.runs, "is_correct"),
        hallucination_rate: boolean_mean(&dataset.runs, "hallucination_flag"),
        relevance_at_5,
        relevance_at_10,
        cost_percentiles: percentiles(&dataset.runs, "total_cost_usd"),
        latency_percentiles: percentiles(&dataset.runs, "total_latency_ms"),
        retrieval_strategies: value_counts(&dataset.runs, "retrieval_strategy", usize::MAX),
        top_domains: value_counts(&dataset.runs, "domain", TOP_DOMAINS),
    }
}

/// Value counts including missing values, sorted by count descending then
/// value, truncated to `limit`. An absent column yields an empty list and
/// its report section is omitted.
fn value_counts(table: &Table, column: &str, limit: usize) -> Vec<ValueCount> {
    let Some(index) = table.column(column) else {
        return Vec::new();
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in table.rows() {
        *counts.entry(row[index].as_deref().unwrap_or(MISSING_LABEL)).or_insert(0) += 1;
    }

    let mut entries = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect::<Vec<ValueCount>>();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    entries.truncate(limit);
    entries
}

/// Mean of a boolean-flag column; `None` when the column is absent or holds
/// no coercible values.
fn boolean_mean(table: &Table, column: &str) -> Option<f64> {
    let index = table.column(column)?;
    let values = table
        .rows()
        .iter()
        .filter_map(|row| row[index].as_deref().and_then(parse_boolean))
        .collect::<Vec<f64>>();
    mean(&values)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn percentiles(table: &Table, column: &str) -> Option<PercentileSummary> {
    let index = table.column(column)?;
    let mut values = table
        .rows()
        .iter()
        .filter_map(|row| row[index].as_deref().and_then(parse_number))
        .collect::<Vec<f64>>();
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));

    Some(PercentileSummary {
        p50: percentile(&values, 0.50),
        p90: percentile(&values, 0.90),
        p95: percentile(&values, 0.95),
        p99: percentile(&values, 0.99),
    })
}

/// Linearly interpolated percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    let fraction = position - low as f64;
    sorted[low] + (sorted[high] - sorted[low]) * fraction
}

/// Mean relevance over events ranked at or above 5 and 10. Requires both
/// the rank and relevance columns; rows without a numeric rank are skipped.
fn relevance_at_k(events: &Table) -> (Option<f64>, Option<f64>) {
    let (Some(rank), Some(relevant)) = (events.column("rank"), events.column("is_relevant"))
    else {
        return (None, None);
    };

    let mut at_5 = Vec::new();
    let mut at_10 = Vec::new();
    for row in events.rows() {
        let Some(rank) = row[rank].as_deref().and_then(parse_number) else {
            continue;
        };
        let Some(value) = row[relevant].as_deref().and_then(parse_boolean) else {
            continue;
        };
        if rank <= 5.0 {
            at_5.push(value);
        }
        if rank <= 10.0 {
            at_10.push(value);
        }
    }

    (mean(&at_5), mean(&at_10))
}

fn render_markdown(report: &DatasetStatsReport) -> String {
    let mut md = String::new();

    md.push_str("# Dataset Stats\n\n");
    md.push_str(&format!(
        "- **Total rows:** **{}** across 5 data tables (+ data dictionary)\n",
        group_thousands(report.total_rows)
    ));

    md.push_str("\n## Table sizes\n\n");
    md.push_str("| Table | Rows |\n|---|---:|\n");
    for (name, rows) in [
        ("rag_corpus_documents", report.table_rows.documents),
        ("rag_corpus_chunks", report.table_rows.chunks),
        ("rag_qa_scenarios", report.table_rows.scenarios),
        ("rag_qa_eval_runs", report.table_rows.runs),
        ("rag_retrieval_events", report.table_rows.events),
    ] {
        md.push_str(&format!("| {name} | {} |\n", group_thousands(rows)));
    }

    if report.accuracy.is_some() || report.hallucination_rate.is_some() {
        md.push_str("\n## Labels & quality signals\n\n");
        if let Some(accuracy) = report.accuracy {
            md.push_str(&format!(
                "- **Accuracy (mean is_correct):** {}\n",
                format_percent(accuracy)
            ));
        }
        if let Some(rate) = report.hallucination_rate {
            md.push_str(&format!(
                "- **Hallucination rate (mean hallucination_flag):** {}\n",
                format_percent(rate)
            ));
        }
    }

    if report.relevance_at_5.is_some() || report.relevance_at_10.is_some() {
        md.push_str("\n## Retrieval relevance @k\n\n");
        if let Some(value) = report.relevance_at_5 {
            md.push_str(&format!(
                "- **rel@5 (mean is_relevant where rank<=5):** {}\n",
                format_percent(value)
            ));
        }
        if let Some(value) = report.relevance_at_10 {
            md.push_str(&format!(
                "- **rel@10 (mean is_relevant where rank<=10):** {}\n",
                format_percent(value)
            ));
        }
    }

    if let Some(cost) = report.cost_percentiles {
        md.push_str("\n## Cost percentiles (USD)\n\n");
        md.push_str("| p50 | p90 | p95 | p99 |\n|---:|---:|---:|---:|\n");
        md.push_str(&format!(
            "| {:.6} | {:.6} | {:.6} | {:.6} |\n",
            cost.p50, cost.p90, cost.p95, cost.p99
        ));
    }

    if let Some(latency) = report.latency_percentiles {
        md.push_str("\n## Latency percentiles (ms)\n\n");
        md.push_str("| p50 | p90 | p95 | p99 |\n|---:|---:|---:|---:|\n");
        md.push_str(&format!(
            "| {:.2} | {:.2} | {:.2} | {:.2} |\n",
            latency.p50, latency.p90, latency.p95, latency.p99
        ));
    }

    if !report.retrieval_strategies.is_empty() {
        md.push_str("\n## Top retrieval strategies\n\n");
        md.push_str("| retrieval_strategy | count |\n|---|---:|\n");
        for entry in &report.retrieval_strategies {
            md.push_str(&format!(
                "| {} | {} |\n",
                entry.value,
                group_thousands(entry.count)
            ));
        }
    }

    if !report.top_domains.is_empty() {
        md.push_str("\n## Top domains (runs)\n\n");
        md.push_str("| domain | count |\n|---|---:|\n");
        for entry in &report.top_domains {
            md.push_str(&format!(
                "| {} | {} |\n",
                entry.value,
                group_thousands(entry.count)
            ));
        }
    }

    md
}

fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", 100.0 * ratio)
}

fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
