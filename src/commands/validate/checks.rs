use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};

use crate::table::{Table, parse_number};

/// Violation messages carry at most this many offending values.
pub const SAMPLE_LIMIT: usize = 10;

pub fn require_columns(table: &Table, required: &[&str]) -> Result<()> {
    let missing = required
        .iter()
        .copied()
        .filter(|column| !table.has_column(column))
        .collect::<Vec<&str>>();

    if !missing.is_empty() {
        bail!("[{}] missing required columns: {missing:?}", table.name());
    }

    Ok(())
}

/// Primary-key uniqueness over one or more key columns. Null cells take
/// part in the key tuple, so repeated all-null keys are duplicates too.
pub fn check_unique(table: &Table, key_columns: &[&str]) -> Result<()> {
    for column in key_columns {
        if !table.has_column(column) {
            bail!(
                "[{}] expected primary key column '{column}' but it is missing",
                table.name()
            );
        }
    }

    let indices = key_columns
        .iter()
        .map(|column| table.column(column).unwrap_or_default())
        .collect::<Vec<usize>>();

    let mut counts: HashMap<Vec<Option<&str>>, usize> = HashMap::with_capacity(table.len());
    for position in 0..table.len() {
        let key = indices
            .iter()
            .map(|&column| table.value(position, column))
            .collect::<Vec<Option<&str>>>();
        *counts.entry(key).or_insert(0) += 1;
    }

    let duplicated = counts.values().filter(|&&count| count > 1).count();
    if duplicated == 0 {
        return Ok(());
    }

    let mut sample = Vec::new();
    let mut sampled: HashSet<Vec<Option<&str>>> = HashSet::new();
    for position in 0..table.len() {
        let key = indices
            .iter()
            .map(|&column| table.value(position, column))
            .collect::<Vec<Option<&str>>>();
        if counts[&key] > 1 && sampled.insert(key.clone()) {
            sample.push(format_key(&key));
            if sample.len() == SAMPLE_LIMIT {
                break;
            }
        }
    }

    bail!(
        "[{}] primary key {} has {duplicated} duplicated values. Sample: {sample:?}",
        table.name(),
        format_key_columns(key_columns)
    );
}

pub fn check_not_null(table: &Table, columns: &[&str]) -> Result<()> {
    require_columns(table, columns)?;

    let mut offending = Vec::new();
    for column in columns {
        let index = table.column(column).unwrap_or_default();
        let nulls = table
            .rows()
            .iter()
            .filter(|row| row[index].is_none())
            .count();
        if nulls > 0 {
            offending.push(format!("{column} ({nulls} rows)"));
        }
    }

    if !offending.is_empty() {
        bail!(
            "[{}] missing values in required columns: {}",
            table.name(),
            offending.join(", ")
        );
    }

    Ok(())
}

/// Foreign-key completeness: every distinct non-null child value must exist
/// among the parent's distinct non-null values.
pub fn check_foreign_key(
    child: &Table,
    child_column: &str,
    parent: &Table,
    parent_column: &str,
) -> Result<()> {
    require_columns(child, &[child_column])?;
    require_columns(parent, &[parent_column])?;

    let child_values = child.distinct_non_null(child.column(child_column).unwrap_or_default());
    let parent_values = parent.distinct_non_null(parent.column(parent_column).unwrap_or_default());

    let mut missing = child_values
        .difference(&parent_values)
        .copied()
        .collect::<Vec<&str>>();
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort_unstable();

    let sample = missing
        .iter()
        .take(SAMPLE_LIMIT)
        .copied()
        .collect::<Vec<&str>>();
    bail!(
        "[{}] FK violation: '{child_column}' has {} values not present in [{}].{parent_column}. Sample: {sample:?}",
        child.name(),
        missing.len(),
        parent.name()
    );
}

/// Enum membership over non-null values, compared as raw strings.
pub fn check_in_set(table: &Table, column: &str, allowed: &[&str]) -> Result<()> {
    require_columns(table, &[column])?;
    let index = table.column(column).unwrap_or_default();

    let mut bad = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for row in table.rows() {
        let Some(value) = row[index].as_deref() else {
            continue;
        };
        if !allowed.contains(&value) && seen.insert(value) {
            bad.push(value);
        }
    }

    if !bad.is_empty() {
        let sample = bad.iter().take(SAMPLE_LIMIT).copied().collect::<Vec<&str>>();
        bail!(
            "[{}.{column}] contains unexpected values. Sample: {sample:?}",
            table.name()
        );
    }

    Ok(())
}

/// Numeric range check with best-effort coercion; non-numeric values count
/// as missing and are ignored.
pub fn check_range(
    table: &Table,
    column: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<()> {
    require_columns(table, &[column])?;
    let index = table.column(column).unwrap_or_default();

    let mut offending = 0_usize;
    let mut sample = Vec::new();
    for row in table.rows() {
        let Some(raw) = row[index].as_deref() else {
            continue;
        };
        let Some(value) = parse_number(raw) else {
            continue;
        };

        let below = min.map(|bound| value < bound).unwrap_or(false);
        let above = max.map(|bound| value > bound).unwrap_or(false);
        if below || above {
            offending += 1;
            if sample.len() < SAMPLE_LIMIT {
                sample.push(raw.to_string());
            }
        }
    }

    if offending > 0 {
        bail!(
            "[{}.{column}] has {offending} values outside the allowed range {}. Sample: {sample:?}",
            table.name(),
            format_bounds(min, max)
        );
    }

    Ok(())
}

/// Free-text columns must carry text: a missing cell or one that trims to
/// zero length is a violation.
pub fn check_non_empty(table: &Table, column: &str) -> Result<()> {
    require_columns(table, &[column])?;
    let index = table.column(column).unwrap_or_default();

    let empty = table
        .rows()
        .iter()
        .filter(|row| {
            row[index]
                .as_deref()
                .map(|value| value.trim().is_empty())
                .unwrap_or(true)
        })
        .count();

    if empty > 0 {
        bail!(
            "[{}.{column}] has {empty} rows with empty text",
            table.name()
        );
    }

    Ok(())
}

fn format_key(parts: &[Option<&str>]) -> String {
    if let [single] = parts {
        return single.unwrap_or("").to_string();
    }
    let joined = parts
        .iter()
        .map(|part| part.unwrap_or(""))
        .collect::<Vec<&str>>()
        .join(", ");
    format!("({joined})")
}

fn format_key_columns(columns: &[&str]) -> String {
    if let [single] = columns {
        return format!("'{single}'");
    }
    format!("({})", columns.join(", "))
}

fn format_bounds(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(low), Some(high)) => format!("[{low}, {high}]"),
        (Some(low), None) => format!(">= {low}"),
        (None, Some(high)) => format!("<= {high}"),
        (None, None) => "(unbounded)".to_string(),
    }
}
