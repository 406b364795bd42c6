use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::util::ensure_directory;

/// An in-memory relational table: header-derived column names plus ordered
/// rows of optional string cells. An empty CSV field loads as a missing
/// value. No types are enforced at load time; numeric and boolean coercion
/// happens at the point of use.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new<S: Into<String>>(name: &str, columns: Vec<S>) -> Table {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(index, column)| (column.clone(), index))
            .collect();

        Table {
            name: name.to_string(),
            columns,
            column_index,
            rows: Vec::new(),
        }
    }

    pub fn from_csv(path: &Path, name: &str) -> Result<Table> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open csv for [{name}]: {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("failed to read csv header: {}", path.display()))?
            .iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<String>>();

        let mut table = Table::new(name, headers);
        if table.column_index.len() != table.columns.len() {
            bail!("[{name}] duplicate column names in header: {}", path.display());
        }

        for record in reader.records() {
            let record = record
                .with_context(|| format!("failed to read csv record: {}", path.display()))?;
            let row = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect::<Vec<Option<String>>>();
            table.rows.push(row);
        }

        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_directory(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create csv file: {}", path.display()))?;

        writer
            .write_record(&self.columns)
            .with_context(|| format!("failed to write csv header: {}", path.display()))?;

        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .with_context(|| format!("failed to write csv record: {}", path.display()))?;
        }

        writer
            .flush()
            .with_context(|| format!("failed to flush csv file: {}", path.display()))?;

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows[row][column].as_deref()
    }

    /// Cell lookup by column name; missing column and missing value are both
    /// `None`.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        self.column(column)
            .and_then(|index| self.rows[row][index].as_deref())
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn push_column(&mut self, name: &str, values: Vec<Option<String>>) -> Result<()> {
        if self.has_column(name) {
            bail!("[{}] column '{name}' already exists", self.name);
        }
        if values.len() != self.rows.len() {
            bail!(
                "[{}] column '{name}' has {} values for {} rows",
                self.name,
                values.len(),
                self.rows.len()
            );
        }

        self.column_index.insert(name.to_string(), self.columns.len());
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }

        Ok(())
    }

    /// Distinct non-null values of one column.
    pub fn distinct_non_null(&self, column: usize) -> HashSet<&str> {
        self.rows
            .iter()
            .filter_map(|row| row[column].as_deref())
            .collect()
    }

    /// Hash index from key value to row position. Null keys are skipped;
    /// a repeated non-null key fails, which is what makes a join against
    /// this table provably many-to-one.
    pub fn unique_index(&self, column: usize) -> Result<HashMap<&str, usize>> {
        let mut index = HashMap::with_capacity(self.rows.len());
        for (position, row) in self.rows.iter().enumerate() {
            let Some(key) = row[column].as_deref() else {
                continue;
            };
            if index.insert(key, position).is_some() {
                bail!(
                    "[{}] join key '{}' is not unique (value '{key}'); expected a many-to-one join",
                    self.name,
                    self.columns[column]
                );
            }
        }
        Ok(index)
    }

    /// Rows whose value in `column` is non-null and contained in `keys`,
    /// preserving input order.
    pub fn filter_by_key_set(&self, column: usize, keys: &HashSet<String>) -> Table {
        let mut filtered = self.empty_like();
        for row in &self.rows {
            if row[column]
                .as_deref()
                .map(|value| keys.contains(value))
                .unwrap_or(false)
            {
                filtered.rows.push(row.clone());
            }
        }
        filtered
    }

    /// Same header, zero rows.
    pub fn empty_like(&self) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            column_index: self.column_index.clone(),
            rows: Vec::new(),
        }
    }
}

/// Best-effort numeric coercion: trimmed parse to a finite f64. Everything
/// else (including explicit NaN/inf markers) counts as missing.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// Boolean coercion for labeled-outcome columns: accepts 0/1 and the
/// true/false string variants, then falls back to a numeric parse.
pub fn parse_boolean(value: &str) -> Option<f64> {
    match value.trim() {
        "1" | "true" | "True" | "TRUE" => Some(1.0),
        "0" | "false" | "False" | "FALSE" => Some(0.0),
        other => parse_number(other),
    }
}
