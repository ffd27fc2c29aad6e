//! Join key inference.
//!
//! Decides, per axis, which cell-table field identifies a row or column.
//! A declared axis matches its own header against the cell header by name.
//! A discovered axis takes fixed cell fields from the options and relocates
//! them out of the value records.

use log::{debug, warn};

use crate::{
    config::ReconcileOptions,
    error::{Error, Result},
    table::AxisKind,
};

/// Where a declared axis's join key sits in each table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    /// Position of the key field in the cell header.
    pub values_key: usize,
    /// Position of the key field in the axis header.
    pub axis_key: usize,
}

/// Result of a declared key search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatch {
    /// The chosen binding.
    pub binding: KeyBinding,
    /// Axis fields passed over because their only cell match was already
    /// claimed by the other axis.
    pub conflicts: usize,
}

/// Finds the join key of a declared axis.
///
/// Axis fields are tried in order; the first one whose name appears in the
/// cell header at a position not listed in `claimed` wins.
///
/// # Errors
///
/// Returns [`Error::KeyInference`] if no axis field matches.
pub fn infer_declared_key(
    kind: AxisKind,
    axis_header: &[String],
    cell_header: &[String],
    claimed: &[usize],
) -> Result<KeyMatch> {
    let mut conflicts = 0;

    for (axis_key, name) in axis_header.iter().enumerate() {
        let mut matches = cell_header
            .iter()
            .enumerate()
            .filter(|(_, cell_name)| *cell_name == name)
            .map(|(i, _)| i)
            .peekable();

        if matches.peek().is_none() {
            continue;
        }

        match matches.find(|i| !claimed.contains(i)) {
            Some(values_key) => {
                debug!("{kind} key '{name}': axis field {axis_key}, cell field {values_key}");
                return Ok(KeyMatch {
                    binding: KeyBinding {
                        values_key,
                        axis_key,
                    },
                    conflicts,
                });
            }
            None => {
                warn!("{kind} key candidate '{name}' skipped: cell field already claimed");
                conflicts += 1;
            }
        }
    }

    Err(Error::key_inference(kind, axis_header))
}

/// How one axis of the matrix gets its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisPlan {
    /// Matched against a supplied annotation table.
    Declared(KeyBinding),
    /// Synthesized from these cell fields; the first is the key.
    Discovered {
        /// Cell-header positions forming the axis header.
        fields: Vec<usize>,
    },
}

impl AxisPlan {
    /// Returns the cell-header position of the join key, or `None` for a
    /// discovered plan with no fields.
    pub fn values_key(&self) -> Option<usize> {
        match self {
            Self::Declared(binding) => Some(binding.values_key),
            Self::Discovered { fields } => fields.first().copied(),
        }
    }

    fn relocated(&self) -> &[usize] {
        match self {
            Self::Declared(_) => &[],
            Self::Discovered { fields } => fields,
        }
    }
}

/// Key decisions for both axes plus the cell fields that remain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    /// Row axis plan.
    pub rows: AxisPlan,
    /// Column axis plan.
    pub columns: AxisPlan,
    /// Cell-header positions kept in the value records, in header order.
    pub value_fields: Vec<usize>,
    /// Declared key candidates skipped because the other axis held them.
    pub conflicts: usize,
}

impl JoinPlan {
    /// Projects the cell header onto the value fields.
    pub fn value_header(&self, cell_header: &[String]) -> Vec<String> {
        self.value_fields
            .iter()
            .map(|&i| cell_header[i].clone())
            .collect()
    }

    /// Returns true if the value records are the cell records unchanged.
    pub fn keeps_full_records(&self, cell_header_len: usize) -> bool {
        self.value_fields.len() == cell_header_len
    }
}

/// Decides the join plan for a cell header.
///
/// `row_header` and `col_header` are the headers of the supplied annotation
/// tables; an absent header puts that axis in discovery. Discovered axes
/// claim their fields first, then declared searches run row before column,
/// each skipping fields already claimed.
///
/// # Errors
///
/// Returns an error if a discovery field is outside the cell header, the
/// two axes would share a field, or a declared search finds no key.
pub fn infer_join_plan(
    options: &ReconcileOptions,
    row_header: Option<&[String]>,
    col_header: Option<&[String]>,
    cell_header: &[String],
) -> Result<JoinPlan> {
    let discovered = |kind: AxisKind, declared: bool| -> Result<Vec<usize>> {
        if declared {
            return Ok(Vec::new());
        }
        let fields = options.discovery_fields(kind);
        if fields.is_empty() {
            return Err(Error::invalid_config(format!(
                "{kind} annotation field list is empty"
            )));
        }
        if let Some(&index) = fields.iter().find(|&&i| i >= cell_header.len()) {
            return Err(Error::IndexOutOfBounds {
                index,
                len: cell_header.len(),
            });
        }
        Ok(fields)
    };

    let row_fields = discovered(AxisKind::Row, row_header.is_some())?;
    let col_fields = discovered(AxisKind::Column, col_header.is_some())?;
    if let Some(shared) = row_fields.iter().find(|i| col_fields.contains(i)) {
        return Err(Error::invalid_config(format!(
            "field {shared} is claimed by both the row and column axis"
        )));
    }

    let mut claimed: Vec<usize> = row_fields.iter().chain(&col_fields).copied().collect();
    let mut conflicts = 0;

    let rows = match row_header {
        Some(header) => {
            let found = infer_declared_key(AxisKind::Row, header, cell_header, &claimed)?;
            conflicts += found.conflicts;
            claimed.push(found.binding.values_key);
            AxisPlan::Declared(found.binding)
        }
        None => AxisPlan::Discovered { fields: row_fields },
    };
    let columns = match col_header {
        Some(header) => {
            let found = infer_declared_key(AxisKind::Column, header, cell_header, &claimed)?;
            conflicts += found.conflicts;
            AxisPlan::Declared(found.binding)
        }
        None => AxisPlan::Discovered { fields: col_fields },
    };

    let value_fields = (0..cell_header.len())
        .filter(|i| !rows.relocated().contains(i) && !columns.relocated().contains(i))
        .collect();

    Ok(JoinPlan {
        rows,
        columns,
        value_fields,
        conflicts,
    })
}
