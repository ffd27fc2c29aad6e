//! Reconciliation entry point.
//!
//! [`Reconciler`] runs key inference, indexing and assembly over three
//! loaded tables and publishes a [`ReconciledMatrix`].

use log::info;

use crate::{
    assemble::{assemble_wide, densify, AssemblyReport, SparseCellInput},
    config::{JoinMode, ReconcileOptions},
    error::{Error, Result},
    index::{index_declared, scan, AxisResolver},
    keys::{infer_join_plan, AxisPlan},
    matrix::ReconciledMatrix,
    table::{AxisKind, Table},
};

/// Builds reconciled matrices with one set of options.
///
/// # Example
///
/// ```
/// use heatmatrix::{ReconcileOptions, Reconciler, Table};
///
/// let cells = Table::from_rows(vec![
///     vec!["row", "col", "value"],
///     vec!["r1", "c1", "5"],
///     vec!["r2", "c1", "6"],
///     vec!["r1", "c2", "7"],
/// ])
/// .unwrap();
///
/// let options = ReconcileOptions::new().with_discovery_keys(0, 1);
/// let matrix = Reconciler::new(options).unwrap().reconcile(None, None, cells).unwrap();
///
/// let r2 = matrix.row_position("r2").unwrap();
/// let c2 = matrix.col_position("c2").unwrap();
/// assert!(matrix.is_missing(r2, c2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    /// Creates a reconciler after validating `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the options are inconsistent.
    pub fn new(options: ReconcileOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Returns the options in use.
    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Reconciles the supplied tables into a matrix.
    ///
    /// `rows` and `columns` are the optional annotation tables. Declared mode
    /// needs at least one of them; the other axis is discovered. Discovery
    /// and wide format take the cell table alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] if a supplied table has not been loaded,
    /// [`Error::InvalidConfig`] if the tables do not fit the join mode, and
    /// any key inference error. Unresolved or malformed cell records are
    /// not errors; they are counted in the report.
    pub fn reconcile(
        &self,
        rows: Option<Table>,
        columns: Option<Table>,
        cells: Table,
    ) -> Result<ReconciledMatrix> {
        let missing: Vec<&'static str> = [
            ("rows", rows.as_ref()),
            ("columns", columns.as_ref()),
            ("cells", Some(&cells)),
        ]
        .into_iter()
        .filter(|(_, table)| table.is_some_and(|t| !t.is_ready()))
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(Error::NotReady { missing });
        }

        let mode = self.options.join_mode;
        match (mode, rows.is_some() || columns.is_some()) {
            (JoinMode::Declared, false) => {
                return Err(Error::invalid_config(
                    "declared mode needs a row or column annotation table",
                ));
            }
            (JoinMode::Discovery | JoinMode::WideFormat, true) => {
                return Err(Error::invalid_config(format!(
                    "{mode:?} mode takes no annotation tables"
                )));
            }
            _ => {}
        }

        let input = SparseCellInput::from_table(cells)?;
        let matrix = if mode == JoinMode::WideFormat {
            let wide = assemble_wide(input);
            ReconciledMatrix::new(
                mode,
                (wide.rows, None),
                (wide.columns, None),
                wide.cells,
                wide.report,
            )
        } else {
            self.assemble_keyed(rows, columns, input)?
        };

        let report = matrix.report();
        info!(
            "reconciled {}x{} matrix ({mode:?}): {} placed, {} dropped, {} overwritten",
            matrix.row_count(),
            matrix.column_count(),
            report.placed,
            report.dropped(),
            report.overwritten,
        );
        Ok(matrix)
    }

    fn assemble_keyed(
        &self,
        rows: Option<Table>,
        columns: Option<Table>,
        input: SparseCellInput,
    ) -> Result<ReconciledMatrix> {
        let plan = infer_join_plan(
            &self.options,
            rows.as_ref().map(Table::header),
            columns.as_ref().map(Table::header),
            input.header(),
        )?;

        let mut report = AssemblyReport {
            key_conflicts: plan.conflicts,
            ..AssemblyReport::default()
        };

        let mut declared = |kind: AxisKind, plan: &AxisPlan, table: Option<Table>| {
            let (AxisPlan::Declared(binding), Some(table)) = (plan, table) else {
                return None;
            };
            let (axis, index, stats) = index_declared(kind, &table, binding.axis_key);
            report.duplicate_axis_keys += stats.duplicates;
            report.unkeyed_axis_records += stats.unkeyed;
            Some((axis, index))
        };
        let row_source = declared(AxisKind::Row, &plan.rows, rows);
        let col_source = declared(AxisKind::Column, &plan.columns, columns);

        let (Some(mut row_resolver), Some(mut col_resolver)) = (
            AxisResolver::for_plan(AxisKind::Row, &plan.rows, input.header(), row_source),
            AxisResolver::for_plan(AxisKind::Column, &plan.columns, input.header(), col_source),
        ) else {
            return Err(Error::invalid_config(
                "join plan does not match the supplied tables",
            ));
        };

        let scanned = scan(input.records(), &mut row_resolver, &mut col_resolver);
        let (row_axis, row_index) = row_resolver.finish();
        let (col_axis, col_index) = col_resolver.finish();

        let (cells, overwritten) = densify(
            input,
            &plan.value_fields,
            row_axis.len(),
            col_axis.len(),
            &scanned.placements,
        );

        report.records_scanned = scanned.scanned;
        report.gaps = scanned.gaps;
        report.unresolved = scanned.unresolved;
        report.placed = scanned.placements.len() - overwritten;
        report.overwritten = overwritten;

        Ok(ReconciledMatrix::new(
            self.options.join_mode,
            (row_axis, Some(row_index)),
            (col_axis, Some(col_index)),
            cells,
            report,
        ))
    }
}

/// Reconciles with the given options in one call.
///
/// # Errors
///
/// See [`Reconciler::reconcile`].
pub fn reconcile(
    options: &ReconcileOptions,
    rows: Option<Table>,
    columns: Option<Table>,
    cells: Table,
) -> Result<ReconciledMatrix> {
    Reconciler::new(options.clone())?.reconcile(rows, columns, cells)
}
