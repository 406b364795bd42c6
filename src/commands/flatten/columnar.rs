use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::table::Table;

/// Every column is written as nullable Utf8: the loader is untyped by
/// contract, so the columnar file carries the same cells as the delimited
/// fallback would.
pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let fields = table
        .columns()
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect::<Vec<Field>>();
    let schema = Arc::new(Schema::new(fields));

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());
    for column in 0..table.columns().len() {
        let values = table
            .rows()
            .iter()
            .map(|row| row[column].as_deref())
            .collect::<StringArray>();
        arrays.push(Arc::new(values));
    }

    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .context("failed to assemble arrow record batch")?;

    let file = File::create(path)
        .with_context(|| format!("failed to create parquet file: {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, None).context("failed to start parquet writer")?;
    writer
        .write(&batch)
        .context("failed to write parquet row group")?;
    writer.close().context("failed to finalize parquet file")?;

    Ok(())
}
