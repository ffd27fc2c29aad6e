#![allow(clippy::unwrap_used)]
//! Property-based tests for matrix assembly.
//!
//! Uses proptest to check that assembly invariants hold across random
//! cell tables.

use std::collections::{HashMap, HashSet};

use heatmatrix::{JoinMode, ReconcileOptions, ReconciledMatrix, Reconciler, Table};
use proptest::prelude::*;

/// Cell records over a small key space so duplicates and gaps are common.
fn cell_records() -> impl Strategy<Value = Vec<(String, String, String)>> {
    prop::collection::vec(("r[0-5]", "c[0-4]", "[0-9]{1,3}"), 0..60)
}

fn discovery_table(records: &[(String, String, String)]) -> Table {
    let mut rows = vec![vec!["row".to_string(), "col".to_string(), "value".to_string()]];
    rows.extend(
        records
            .iter()
            .map(|(r, c, v)| vec![r.clone(), c.clone(), v.clone()]),
    );
    Table::from_rows(rows).unwrap()
}

fn discover(records: &[(String, String, String)]) -> ReconciledMatrix {
    let options = ReconcileOptions::new().with_discovery_keys(0, 1);
    Reconciler::new(options)
        .unwrap()
        .reconcile(None, None, discovery_table(records))
        .unwrap()
}

proptest! {
    /// Property: identical input gives identical axes and values
    #[test]
    fn prop_idempotent(records in cell_records()) {
        let a = discover(&records);
        let b = discover(&records);
        prop_assert_eq!(a.rows(), b.rows());
        prop_assert_eq!(a.columns(), b.columns());
        prop_assert_eq!(a.cells(), b.cells());
        prop_assert_eq!(a.row_index(), b.row_index());
        prop_assert_eq!(a.report(), b.report());
    }

    /// Property: every in-range slot is either a record or missing
    #[test]
    fn prop_complete(records in cell_records()) {
        let m = discover(&records);
        prop_assert_eq!(m.cells().len(), m.row_count() * m.column_count());
        for i in 0..m.row_count() {
            for j in 0..m.column_count() {
                prop_assert!(m.value_at(i, j).is_some() != m.is_missing(i, j));
            }
        }
    }

    /// Property: distinct positions carry distinct keys on both axes
    #[test]
    fn prop_keys_unique(records in cell_records()) {
        let m = discover(&records);
        let rows: HashSet<_> = (0..m.row_count()).filter_map(|i| m.row_key_at(i)).collect();
        let cols: HashSet<_> = (0..m.column_count()).filter_map(|j| m.col_key_at(j)).collect();
        prop_assert_eq!(rows.len(), m.row_count());
        prop_assert_eq!(cols.len(), m.column_count());
        for i in 0..m.row_count() {
            prop_assert_eq!(m.row_position(m.row_key_at(i).unwrap()), Some(i));
        }
    }

    /// Property: the last record for a (row, col) pair is the one kept
    #[test]
    fn prop_last_wins(records in cell_records()) {
        let m = discover(&records);
        let mut expected: HashMap<(&str, &str), &str> = HashMap::new();
        for (r, c, v) in &records {
            expected.insert((r.as_str(), c.as_str()), v.as_str());
        }

        prop_assert_eq!(m.report().placed, expected.len());
        prop_assert_eq!(m.report().overwritten, records.len() - expected.len());
        for ((r, c), v) in &expected {
            let i = m.row_position(r).unwrap();
            let j = m.col_position(c).unwrap();
            prop_assert_eq!(m.value_field(i, j, 0), Some(*v));
        }
    }

    /// Property: row positions follow first appearance in the cell table
    #[test]
    fn prop_first_seen_order(records in cell_records()) {
        let m = discover(&records);
        let mut seen = Vec::new();
        for (r, _, _) in &records {
            if !seen.contains(&r.as_str()) {
                seen.push(r.as_str());
            }
        }
        let keys: Vec<_> = (0..m.row_count()).filter_map(|i| m.row_key_at(i)).collect();
        prop_assert_eq!(keys, seen);
    }

    /// Property: wide format keeps exactly the records of the right width
    #[test]
    fn prop_wide_shape(
        widths in prop::collection::vec(1usize..6, 0..20),
        columns in 1usize..5,
    ) {
        let mut header = vec!["Row".to_string()];
        header.extend((0..columns).map(|c| format!("col{c}")));
        let mut rows = vec![header];
        for (i, width) in widths.iter().enumerate() {
            let mut record = vec![format!("r{i}")];
            record.extend((1..*width).map(|k| k.to_string()));
            rows.push(record);
        }
        let table = Table::from_rows(rows).unwrap();

        let options = ReconcileOptions::new().with_join_mode(JoinMode::WideFormat);
        let m = Reconciler::new(options).unwrap().reconcile(None, None, table).unwrap();

        let accepted = widths.iter().filter(|&&w| w == columns + 1).count();
        prop_assert_eq!(m.row_count(), accepted);
        prop_assert_eq!(m.column_count(), columns);
        prop_assert_eq!(m.report().dimension_mismatches, widths.len() - accepted);
        prop_assert_eq!(m.cells().missing_count(), 0);
    }
}
