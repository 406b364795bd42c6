use std::collections::HashSet;
use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use crate::cli::{FlattenArgs, OutputFormat};
use crate::dataset::Dataset;
use crate::table::{Table, parse_number};
use crate::util::ensure_directory;

#[cfg(feature = "parquet")]
mod columnar;
#[cfg(test)]
mod tests;

pub fn run(args: FlattenArgs) -> Result<()> {
    let dataset = Dataset::load(&args.data_dir)?;
    let flat = build_flat_table(&dataset)?;
    write_output(&flat, &args.out, args.format)
}

/// One row per retrieval event, with run, chunk, document, and scenario
/// attributes attached, plus the derived bucket columns.
pub fn build_flat_table(dataset: &Dataset) -> Result<Table> {
    let mut flat = left_join_many_to_one(&dataset.events, &dataset.runs, "run_id", "run")?;
    flat = left_join_many_to_one(&flat, &dataset.chunks, "chunk_id", "chunk")?;

    if flat.has_column("doc_id") && dataset.documents.has_column("doc_id") {
        flat = left_join_many_to_one(&flat, &dataset.documents, "doc_id", "doc")?;
    }

    // scenario_id can appear in several tables; the value already on the
    // flat side (event- or run-level) is the one the scenarios join keys on.
    if flat.has_column("scenario_id") && dataset.scenarios.has_column("scenario_id") {
        flat = left_join_many_to_one(&flat, &dataset.scenarios, "scenario_id", "scenario")?;
    }

    if let Some(column) = flat.column("total_latency_ms") {
        let buckets = bucket_column(&flat, column, latency_bucket);
        flat.push_column("latency_bucket", buckets)?;
    }
    if let Some(column) = flat.column("total_cost_usd") {
        let buckets = bucket_column(&flat, column, cost_bucket);
        flat.push_column("cost_bucket", buckets)?;
    }

    Ok(flat)
}

/// Left join keyed on `key`, declared many-to-one: building the unique index
/// over the right table fails loudly if the key repeats there, so event rows
/// can never be duplicated. Right-side columns that collide with a column
/// already on the left get a `_{suffix}` rename; the join key itself is not
/// duplicated.
fn left_join_many_to_one(left: &Table, right: &Table, key: &str, suffix: &str) -> Result<Table> {
    let Some(left_key) = left.column(key) else {
        bail!("[{}] join column '{key}' is missing", left.name());
    };
    let Some(right_key) = right.column(key) else {
        bail!("[{}] join column '{key}' is missing", right.name());
    };

    let right_index = right.unique_index(right_key)?;

    let mut columns = left.columns().to_vec();
    let mut taken = columns.iter().cloned().collect::<HashSet<String>>();
    let mut carried = Vec::new();
    for (index, name) in right.columns().iter().enumerate() {
        if index == right_key {
            continue;
        }
        let out_name = if taken.contains(name) {
            format!("{name}_{suffix}")
        } else {
            name.clone()
        };
        if !taken.insert(out_name.clone()) {
            bail!(
                "[{}] column '{out_name}' still collides after suffixing with '_{suffix}'",
                right.name()
            );
        }
        columns.push(out_name);
        carried.push(index);
    }

    let mut joined = Table::new(left.name(), columns);
    for row in left.rows() {
        let mut out = row.clone();
        let matched = row[left_key]
            .as_deref()
            .and_then(|value| right_index.get(value));
        match matched {
            Some(&position) => {
                let right_row = &right.rows()[position];
                out.extend(carried.iter().map(|&index| right_row[index].clone()));
            }
            None => out.extend(std::iter::repeat_with(|| None).take(carried.len())),
        }
        joined.push_row(out);
    }

    Ok(joined)
}

fn bucket_column(
    table: &Table,
    column: usize,
    bucket: fn(f64) -> Option<&'static str>,
) -> Vec<Option<String>> {
    table
        .rows()
        .iter()
        .map(|row| {
            row[column]
                .as_deref()
                .and_then(parse_number)
                .and_then(bucket)
                .map(str::to_string)
        })
        .collect()
}

/// Bin edges match the analytics convention: (-0.1, 250], (250, 500],
/// (500, 1000], (1000, 2000], (2000, 5000], (5000, inf).
fn latency_bucket(value: f64) -> Option<&'static str> {
    if value <= -0.1 {
        return None;
    }
    Some(if value <= 250.0 {
        "<=250"
    } else if value <= 500.0 {
        "251-500"
    } else if value <= 1000.0 {
        "501-1000"
    } else if value <= 2000.0 {
        "1001-2000"
    } else if value <= 5000.0 {
        "2001-5000"
    } else {
        ">5000"
    })
}

fn cost_bucket(value: f64) -> Option<&'static str> {
    if value <= -0.000001 {
        return None;
    }
    Some(if value <= 0.001 {
        "<=0.001"
    } else if value <= 0.01 {
        "0.001-0.01"
    } else if value <= 0.05 {
        "0.01-0.05"
    } else if value <= 0.1 {
        "0.05-0.1"
    } else if value <= 0.25 {
        "0.1-0.25"
    } else {
        ">0.25"
    })
}

enum SinkFormat {
    #[cfg(feature = "parquet")]
    Parquet,
    Csv,
}

fn resolve_format(format: OutputFormat) -> Result<SinkFormat> {
    match format {
        OutputFormat::Csv => Ok(SinkFormat::Csv),
        #[cfg(feature = "parquet")]
        OutputFormat::Parquet | OutputFormat::Auto => Ok(SinkFormat::Parquet),
        #[cfg(not(feature = "parquet"))]
        OutputFormat::Parquet => {
            bail!("parquet output requested but the columnar writer is not compiled in")
        }
        #[cfg(not(feature = "parquet"))]
        OutputFormat::Auto => {
            tracing::warn!("columnar writer unavailable; falling back to csv output");
            Ok(SinkFormat::Csv)
        }
    }
}

fn write_output(flat: &Table, out: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = out.parent() {
        ensure_directory(parent)?;
    }

    match resolve_format(format)? {
        #[cfg(feature = "parquet")]
        SinkFormat::Parquet => {
            columnar::write_parquet(flat, out)?;
            info!(
                path = %out.display(),
                rows = flat.len(),
                cols = flat.columns().len(),
                "wrote parquet flat table"
            );
        }
        SinkFormat::Csv => {
            let csv_out = out.with_extension("csv");
            flat.write_csv(&csv_out)?;
            info!(
                path = %csv_out.display(),
                rows = flat.len(),
                cols = flat.columns().len(),
                "wrote csv flat table"
            );
        }
    }

    Ok(())
}
