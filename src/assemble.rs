//! Dense matrix assembly.
//!
//! Turns a [`SparseCellInput`] (cell records in file order) into a
//! [`DenseCellMatrix`] addressed as `values[row * columns + col]`, where an
//! empty slot is the missing sentinel.

use log::warn;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    index::{Placement, LOGGED_DROPS},
    table::{Axis, AxisKind, Record, Table},
};

/// Header of the single row attribute produced by wide-format assembly.
pub const WIDE_ROW_HEADER: &str = "Row";

/// Header of the single column attribute produced by wide-format assembly.
pub const WIDE_COLUMN_HEADER: &str = "Column";

/// Header of the single value field produced by wide-format assembly.
pub const WIDE_VALUE_HEADER: &str = "Value";

/// Cell records as loaded, before any key has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseCellInput {
    header: Vec<String>,
    records: Vec<Option<Record>>,
}

impl SparseCellInput {
    /// Takes over a loaded cell table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] if the table has not been loaded.
    pub fn from_table(table: Table) -> Result<Self> {
        if !table.is_ready() {
            return Err(Error::NotReady {
                missing: vec!["cells"],
            });
        }
        let (header, records) = table.into_parts();
        Ok(Self { header, records })
    }

    /// Returns the cell header.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Returns the cell records, gaps included.
    pub fn records(&self) -> &[Option<Record>] {
        &self.records
    }

    /// Returns the number of entries, gaps included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A dense row-major grid of value records.
///
/// `None` marks a missing cell. It is distinct from a record holding an
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseCellMatrix {
    header: Vec<String>,
    values: Vec<Option<Record>>,
    rows: usize,
    columns: usize,
    ready: bool,
}

impl DenseCellMatrix {
    /// Allocates a `rows x columns` grid with every slot missing.
    pub(crate) fn allocate(header: Vec<String>, rows: usize, columns: usize) -> Self {
        Self {
            header,
            values: vec![None; rows * columns],
            rows,
            columns,
            ready: false,
        }
    }

    fn freeze(mut self) -> Self {
        self.ready = true;
        self
    }

    /// Returns the linear offset of `(row, col)`.
    pub fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.columns).then(|| row * self.columns + col)
    }

    /// Returns the record at `(row, col)`; `None` if missing or out of range.
    pub fn value_at(&self, row: usize, col: usize) -> Option<&Record> {
        self.offset(row, col)
            .and_then(|offset| self.values[offset].as_ref())
    }

    /// Returns true if `(row, col)` is in range and holds no record.
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.offset(row, col)
            .is_some_and(|offset| self.values[offset].is_none())
    }

    /// Returns the value field names.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Returns every slot in row-major order.
    pub fn values(&self) -> &[Option<Record>] {
        &self.values
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// Returns the number of slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the grid has no slots.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of missing slots.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Returns true once assembly has finished.
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// What happened to every input record during reconciliation.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Cell records examined (gaps excluded).
    pub records_scanned: usize,
    /// Gap entries skipped in the cell table.
    pub gaps: usize,
    /// Cells holding a record once assembly finished.
    pub placed: usize,
    /// Records dropped because a row or column key could not be resolved.
    pub unresolved: usize,
    /// Placements that replaced an earlier record for the same cell.
    pub overwritten: usize,
    /// Wide-format records dropped for having the wrong field count.
    pub dimension_mismatches: usize,
    /// Declared annotation records ignored because their key repeated.
    pub duplicate_axis_keys: usize,
    /// Declared annotation records ignored because their key was absent.
    pub unkeyed_axis_records: usize,
    /// Declared key candidates skipped because the other axis held them.
    pub key_conflicts: usize,
}

impl AssemblyReport {
    /// Returns the number of cell records that did not reach the matrix.
    pub fn dropped(&self) -> usize {
        self.unresolved + self.dimension_mismatches
    }
}

/// Writes resolved cell records into a freshly allocated grid.
///
/// Records are moved out of `input`, projected onto `value_fields` unless
/// those cover the whole header. When two placements hit the same slot the
/// later one wins. Returns the grid and the number of overwrites.
pub(crate) fn densify(
    input: SparseCellInput,
    value_fields: &[usize],
    rows: usize,
    columns: usize,
    placements: &[Placement],
) -> (DenseCellMatrix, usize) {
    let SparseCellInput { header, mut records } = input;
    let full = value_fields.len() == header.len();
    let value_header = value_fields.iter().map(|&i| header[i].clone()).collect();

    let mut matrix = DenseCellMatrix::allocate(value_header, rows, columns);
    let mut overwritten = 0;

    for placement in placements {
        let Some(record) = records[placement.record].take() else {
            continue;
        };
        let value = if full {
            record
        } else {
            value_fields
                .iter()
                .map(|&i| record.get(i).cloned().flatten())
                .collect()
        };
        let offset = placement.row * columns + placement.col;
        if matrix.values[offset].replace(value).is_some() {
            overwritten += 1;
        }
    }

    (matrix.freeze(), overwritten)
}

/// Result of wide-format assembly.
#[derive(Debug, Clone)]
pub struct WideAssembly {
    /// One position per accepted record, keyed by its first field.
    pub rows: Axis,
    /// One position per header field after the first.
    pub columns: Axis,
    /// The single-field value grid.
    pub cells: DenseCellMatrix,
    /// Drop counts.
    pub report: AssemblyReport,
}

/// Assembles a cell table that is already one record per row.
///
/// The first field of each record is the row key, the rest are that row's
/// values in header order. Records whose length differs from the header are
/// dropped and counted. An absent field becomes a missing cell.
pub fn assemble_wide(input: SparseCellInput) -> WideAssembly {
    let SparseCellInput { header, records } = input;
    let width = header.len();
    let column_count = width.saturating_sub(1);

    let mut report = AssemblyReport::default();
    let mut accepted = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        let Some(record) = record else {
            report.gaps += 1;
            continue;
        };
        report.records_scanned += 1;
        if record.len() == width {
            accepted.push(record);
        } else {
            if report.dimension_mismatches < LOGGED_DROPS {
                warn!(
                    "wide record {i} has {} fields, header has {width}; dropped",
                    record.len()
                );
            }
            report.dimension_mismatches += 1;
        }
    }

    let mut columns = Axis::new(AxisKind::Column, vec![WIDE_COLUMN_HEADER.to_string()], 0);
    for name in header.into_iter().skip(1) {
        columns.push(vec![Some(name)]);
    }

    let mut rows = Axis::new(AxisKind::Row, vec![WIDE_ROW_HEADER.to_string()], 0);
    let mut cells = DenseCellMatrix::allocate(
        vec![WIDE_VALUE_HEADER.to_string()],
        accepted.len(),
        column_count,
    );

    for (row, record) in accepted.into_iter().enumerate() {
        let mut fields = record.into_iter();
        rows.push(vec![fields.next().flatten()]);
        for (col, value) in fields.enumerate() {
            if let Some(value) = value {
                cells.values[row * column_count + col] = Some(vec![Some(value)]);
                report.placed += 1;
            }
        }
    }

    WideAssembly {
        rows: rows.finish(),
        columns: columns.finish(),
        cells: cells.freeze(),
        report,
    }
}
