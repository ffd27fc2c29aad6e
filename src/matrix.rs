//! The reconciled matrix handed to rendering and sorting code.

use crate::{
    assemble::{AssemblyReport, DenseCellMatrix},
    config::JoinMode,
    index::AxisIndex,
    table::{field, Axis, Record},
};

/// Rows, columns and dense cell values, read-only once built.
///
/// Row `i` and column `j` address the value record at linear offset
/// `i * column_count() + j`. A missing cell reads as `None`.
///
/// # Example
///
/// ```
/// use heatmatrix::{JoinMode, ReconcileOptions, Reconciler, Table};
///
/// let cells = Table::from_rows(vec![
///     vec!["Row", "col1", "col2"],
///     vec!["r1", "0.11", "0.12"],
///     vec!["r2", "0.21", "0.22"],
/// ])
/// .unwrap();
///
/// let options = ReconcileOptions::new().with_join_mode(JoinMode::WideFormat);
/// let matrix = Reconciler::new(options).unwrap().reconcile(None, None, cells).unwrap();
///
/// assert_eq!(matrix.row_count(), 2);
/// assert_eq!(matrix.col_key_at(0), Some("col1"));
/// assert_eq!(matrix.value_field(1, 0, 0), Some("0.21"));
/// ```
#[derive(Debug, Clone)]
pub struct ReconciledMatrix {
    mode: JoinMode,
    rows: Axis,
    columns: Axis,
    row_index: Option<AxisIndex>,
    col_index: Option<AxisIndex>,
    cells: DenseCellMatrix,
    report: AssemblyReport,
}

impl ReconciledMatrix {
    pub(crate) fn new(
        mode: JoinMode,
        (rows, row_index): (Axis, Option<AxisIndex>),
        (columns, col_index): (Axis, Option<AxisIndex>),
        cells: DenseCellMatrix,
        report: AssemblyReport,
    ) -> Self {
        Self {
            mode,
            rows,
            columns,
            row_index,
            col_index,
            cells,
            report,
        }
    }

    /// Returns the join mode the matrix was built with.
    pub fn mode(&self) -> JoinMode {
        self.mode
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the join key of row `i`.
    pub fn row_key_at(&self, i: usize) -> Option<&str> {
        self.rows.key_at(i)
    }

    /// Returns the join key of column `j`.
    pub fn col_key_at(&self, j: usize) -> Option<&str> {
        self.columns.key_at(j)
    }

    /// Returns attribute `attr` of row `i`.
    pub fn row_attribute(&self, i: usize, attr: usize) -> Option<&str> {
        self.rows.attribute(i, attr)
    }

    /// Returns attribute `attr` of column `j`.
    pub fn col_attribute(&self, j: usize, attr: usize) -> Option<&str> {
        self.columns.attribute(j, attr)
    }

    /// Returns the value record at `(i, j)`, or `None` when the cell is
    /// missing or out of range.
    pub fn value_at(&self, i: usize, j: usize) -> Option<&Record> {
        self.cells.value_at(i, j)
    }

    /// Returns one field of the value record at `(i, j)`.
    pub fn value_field(&self, i: usize, j: usize, value_field: usize) -> Option<&str> {
        self.value_at(i, j).and_then(|r| field(r, value_field))
    }

    /// Returns true if `(i, j)` is in range and holds no value.
    pub fn is_missing(&self, i: usize, j: usize) -> bool {
        self.cells.is_missing(i, j)
    }

    /// Returns the row holding `key`.
    ///
    /// Wide-format matrices carry no hash index, so the lookup scans.
    pub fn row_position(&self, key: &str) -> Option<usize> {
        match &self.row_index {
            Some(index) => index.position(key),
            None => (0..self.rows.len()).find(|&i| self.rows.key_at(i) == Some(key)),
        }
    }

    /// Returns the column holding `key`.
    pub fn col_position(&self, key: &str) -> Option<usize> {
        match &self.col_index {
            Some(index) => index.position(key),
            None => (0..self.columns.len()).find(|&j| self.columns.key_at(j) == Some(key)),
        }
    }

    /// Returns the row axis.
    pub fn rows(&self) -> &Axis {
        &self.rows
    }

    /// Returns the column axis.
    pub fn columns(&self) -> &Axis {
        &self.columns
    }

    /// Returns the dense cell grid.
    pub fn cells(&self) -> &DenseCellMatrix {
        &self.cells
    }

    /// Returns the row key index, absent for wide-format matrices.
    pub fn row_index(&self) -> Option<&AxisIndex> {
        self.row_index.as_ref()
    }

    /// Returns the column key index, absent for wide-format matrices.
    pub fn col_index(&self) -> Option<&AxisIndex> {
        self.col_index.as_ref()
    }

    /// Returns what happened to the input records.
    pub fn report(&self) -> &AssemblyReport {
        &self.report
    }

    /// Returns true when both axes and the cell grid are complete.
    pub fn is_ready(&self) -> bool {
        self.rows.is_ready() && self.columns.is_ready() && self.cells.is_ready()
    }
}
