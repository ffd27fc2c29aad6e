//! Arrow export of reconciled matrices.
//!
//! Two layouts are offered: long (one row per present cell) and wide (one
//! row per matrix row, one column per column key). Both are plain Utf8
//! [`RecordBatch`]es and can be written with [`write_csv`] or
//! [`write_parquet`].

use std::{path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, RecordBatch, StringArray},
    datatypes::{DataType, Field, Schema},
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::{
    assemble::WIDE_ROW_HEADER,
    error::{Error, Result},
    matrix::ReconciledMatrix,
    table::field,
};

/// Name of the row key column in long batches.
pub const LONG_ROW_KEY: &str = "row_key";

/// Name of the column key column in long batches.
pub const LONG_COL_KEY: &str = "col_key";

fn utf8_batch(names: Vec<String>, columns: Vec<Vec<Option<String>>>) -> Result<RecordBatch> {
    let schema = Schema::new(
        names
            .into_iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let arrays = columns
        .into_iter()
        .map(|values| Arc::new(StringArray::from(values)) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(schema), arrays).map_err(Error::Arrow)
}

impl ReconciledMatrix {
    /// Exports every present cell as one row: `row_key`, `col_key`, then
    /// the value fields.
    ///
    /// Cells appear in row-major order. Reading the batch back in discovery
    /// mode with row field 0 and column field 1 yields the same triples.
    ///
    /// # Errors
    ///
    /// Returns an error if Arrow rejects the batch.
    pub fn to_long_batch(&self) -> Result<RecordBatch> {
        let value_header = self.cells().header();
        let mut names = vec![LONG_ROW_KEY.to_string(), LONG_COL_KEY.to_string()];
        names.extend(value_header.iter().cloned());

        let mut columns = vec![Vec::new(); names.len()];
        for i in 0..self.row_count() {
            for j in 0..self.column_count() {
                let Some(record) = self.value_at(i, j) else {
                    continue;
                };
                columns[0].push(self.row_key_at(i).map(str::to_string));
                columns[1].push(self.col_key_at(j).map(str::to_string));
                for (k, column) in columns[2..].iter_mut().enumerate() {
                    column.push(field(record, k).map(str::to_string));
                }
            }
        }

        utf8_batch(names, columns)
    }

    /// Exports one value field as a grid: a `Row` column with the row keys,
    /// then one column per column key. Missing cells are null.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `value_field` is not a value
    /// field, or an error if Arrow rejects the batch.
    pub fn to_wide_batch(&self, value_field: usize) -> Result<RecordBatch> {
        let width = self.cells().header().len();
        if value_field >= width {
            return Err(Error::IndexOutOfBounds {
                index: value_field,
                len: width,
            });
        }

        let mut names = vec![WIDE_ROW_HEADER.to_string()];
        names.extend(
            (0..self.column_count()).map(|j| self.col_key_at(j).unwrap_or_default().to_string()),
        );

        let mut columns = Vec::with_capacity(names.len());
        columns.push(
            (0..self.row_count())
                .map(|i| self.row_key_at(i).map(str::to_string))
                .collect(),
        );
        for j in 0..self.column_count() {
            columns.push(
                (0..self.row_count())
                    .map(|i| self.value_field(i, j, value_field).map(str::to_string))
                    .collect(),
            );
        }

        utf8_batch(names, columns)
    }
}

/// Writes a batch as delimited text with a header line.
///
/// # Errors
///
/// Returns an error if the file cannot be created or writing fails.
pub fn write_csv(batch: &RecordBatch, path: impl AsRef<Path>, separator: u8) -> Result<()> {
    use arrow_csv::WriterBuilder;

    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| Error::io(e, path))?;

    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(separator)
        .build(file);
    writer.write(batch).map_err(Error::Arrow)?;

    Ok(())
}

/// Writes a batch to a Parquet file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or writing fails.
pub fn write_parquet(batch: &RecordBatch, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| Error::io(e, path))?;

    let props = WriterProperties::builder().build();
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).map_err(Error::Parquet)?;
    writer.write(batch).map_err(Error::Parquet)?;
    writer.close().map_err(Error::Parquet)?;

    Ok(())
}
