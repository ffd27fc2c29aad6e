//! Key-to-position indices.
//!
//! An [`AxisIndex`] maps the string form of a join key to a dense position
//! `0..len`, numbered in first-seen order. Declared axes are indexed from
//! their annotation table; discovered axes grow while the cell table is
//! scanned, both axes in the same pass.

use std::collections::HashMap;

use log::debug;

use crate::{
    keys::AxisPlan,
    table::{field, Axis, AxisKind, Record, Table},
};

/// Number of dropped records logged individually before going quiet.
pub(crate) const LOGGED_DROPS: usize = 5;

/// A dense, first-seen-order mapping from key to position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisIndex {
    positions: HashMap<String, usize>,
    keys: Vec<String>,
}

impl AxisIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: HashMap::with_capacity(capacity),
            keys: Vec::with_capacity(capacity),
        }
    }

    /// Returns the position of `key`, inserting it at the end if new.
    ///
    /// The flag is true when the key was not present before.
    pub fn intern(&mut self, key: &str) -> (usize, bool) {
        if let Some(&position) = self.positions.get(key) {
            return (position, false);
        }
        let position = self.keys.len();
        self.positions.insert(key.to_string(), position);
        self.keys.push(key.to_string());
        (position, true)
    }

    /// Returns the position of `key`.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Returns the key at `position`.
    pub fn key_at(&self, position: usize) -> Option<&str> {
        self.keys.get(position).map(String::as_str)
    }

    /// Returns all keys in position order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no key has been indexed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Records set aside while indexing a declared axis table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Records whose key repeats an earlier record's key.
    pub duplicates: usize,
    /// Records with no value in the key field.
    pub unkeyed: usize,
}

/// Indexes a declared annotation table.
///
/// The first record carrying a key owns it; later duplicates and records
/// without a key are left out of the axis so every position has a unique
/// key. Table order is otherwise preserved.
pub fn index_declared(
    kind: AxisKind,
    table: &Table,
    key_index: usize,
) -> (Axis, AxisIndex, IndexStats) {
    let mut axis = Axis::new(kind, table.header().to_vec(), key_index);
    let mut index = AxisIndex::with_capacity(table.len());
    let mut stats = IndexStats::default();

    for record in table.records().iter().flatten() {
        let Some(key) = field(record, key_index) else {
            stats.unkeyed += 1;
            continue;
        };
        let (_, is_new) = index.intern(key);
        if is_new {
            axis.push(record.clone());
        } else {
            if stats.duplicates < LOGGED_DROPS {
                debug!("duplicate {kind} key '{key}' ignored, first occurrence kept");
            }
            stats.duplicates += 1;
        }
    }

    (axis.finish(), index, stats)
}

/// Resolves one axis while the cell table is scanned.
#[derive(Debug)]
pub(crate) enum AxisResolver {
    /// Looks keys up in a finished declared index.
    Declared {
        axis: Axis,
        index: AxisIndex,
        values_key: usize,
    },
    /// Grows the index and the axis as new keys appear.
    Discovered {
        axis: Axis,
        index: AxisIndex,
        fields: Vec<usize>,
    },
}

impl AxisResolver {
    pub(crate) fn declared(axis: Axis, index: AxisIndex, values_key: usize) -> Self {
        Self::Declared {
            axis,
            index,
            values_key,
        }
    }

    pub(crate) fn discovered(kind: AxisKind, cell_header: &[String], fields: Vec<usize>) -> Self {
        let header = fields
            .iter()
            .map(|&i| cell_header.get(i).cloned().unwrap_or_default())
            .collect();
        Self::Discovered {
            axis: Axis::new(kind, header, 0),
            index: AxisIndex::new(),
            fields,
        }
    }

    /// Builds the resolver an [`AxisPlan`] calls for. Declared plans must
    /// come with their indexed table.
    pub(crate) fn for_plan(
        kind: AxisKind,
        plan: &AxisPlan,
        cell_header: &[String],
        declared: Option<(Axis, AxisIndex)>,
    ) -> Option<Self> {
        match (plan, declared) {
            (AxisPlan::Declared(binding), Some((axis, index))) => {
                Some(Self::declared(axis, index, binding.values_key))
            }
            (AxisPlan::Discovered { fields }, None) if !fields.is_empty() => {
                Some(Self::discovered(kind, cell_header, fields.clone()))
            }
            _ => None,
        }
    }

    /// Returns the position of the record on this axis, registering a new
    /// key first when discovering.
    pub(crate) fn resolve(&mut self, record: &Record) -> Option<usize> {
        match self {
            Self::Declared {
                index, values_key, ..
            } => field(record, *values_key).and_then(|key| index.position(key)),
            Self::Discovered {
                axis,
                index,
                fields,
            } => {
                let key = field(record, *fields.first()?)?;
                let (position, is_new) = index.intern(key);
                if is_new {
                    axis.push(fields.iter().map(|&i| record.get(i).cloned().flatten()).collect());
                }
                Some(position)
            }
        }
    }

    pub(crate) fn finish(self) -> (Axis, AxisIndex) {
        match self {
            Self::Declared { axis, index, .. } | Self::Discovered { axis, index, .. } => {
                (axis.finish(), index)
            }
        }
    }
}

/// Where one cell record lands in the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub record: usize,
    pub row: usize,
    pub col: usize,
}

/// Outcome of the single pass over the cell records.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub placements: Vec<Placement>,
    pub scanned: usize,
    pub gaps: usize,
    pub unresolved: usize,
}

/// Walks the cell records once, resolving both axes for every record.
///
/// Gaps are skipped. A record that misses on either axis is counted as
/// unresolved and gets no placement.
pub(crate) fn scan(
    records: &[Option<Record>],
    rows: &mut AxisResolver,
    columns: &mut AxisResolver,
) -> Scan {
    let mut scan = Scan {
        placements: Vec::with_capacity(records.len()),
        ..Scan::default()
    };

    for (i, record) in records.iter().enumerate() {
        let Some(record) = record else {
            scan.gaps += 1;
            continue;
        };
        scan.scanned += 1;

        let row = rows.resolve(record);
        let col = columns.resolve(record);
        match (row, col) {
            (Some(row), Some(col)) => scan.placements.push(Placement { record: i, row, col }),
            _ => {
                if scan.unresolved < LOGGED_DROPS {
                    debug!(
                        "cell record {i} dropped: row {}, column {}",
                        if row.is_some() { "resolved" } else { "unresolved" },
                        if col.is_some() { "resolved" } else { "unresolved" },
                    );
                }
                scan.unresolved += 1;
            }
        }
    }

    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyBinding;

    fn rec(fields: &[&str]) -> Record {
        fields.iter().map(|f| Some((*f).to_string())).collect()
    }

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_intern_first_seen_order() {
        let mut index = AxisIndex::new();
        assert_eq!(index.intern("b"), (0, true));
        assert_eq!(index.intern("a"), (1, true));
        assert_eq!(index.intern("b"), (0, false));
        assert_eq!(index.len(), 2);
        assert_eq!(index.keys(), ["b", "a"]);
        assert_eq!(index.position("a"), Some(1));
        assert_eq!(index.key_at(0), Some("b"));
        assert_eq!(index.position("c"), None);
    }

    #[test]
    fn test_empty_string_is_a_key() {
        let mut index = AxisIndex::new();
        assert_eq!(index.intern(""), (0, true));
        assert_eq!(index.position(""), Some(0));
    }

    #[test]
    fn test_index_declared_first_wins() {
        let table = Table::from_parts(
            header(&["label", "id"]),
            vec![
                Some(rec(&["First", "r1"])),
                None,
                Some(rec(&["Second", "r2"])),
                Some(rec(&["Again", "r1"])),
                Some(vec![Some("NoKey".to_string()), None]),
                Some(vec![Some("Short".to_string())]),
            ],
        );

        let (axis, index, stats) = index_declared(AxisKind::Row, &table, 1);

        assert_eq!(axis.len(), 2);
        assert_eq!(index.position("r1"), Some(0));
        assert_eq!(index.position("r2"), Some(1));
        assert_eq!(axis.attribute(0, 0), Some("First"));
        assert_eq!(axis.key_at(1), Some("r2"));
        assert_eq!(axis.key_index(), 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.unkeyed, 2);
        assert!(axis.is_ready());
    }

    #[test]
    fn test_discovered_resolver_builds_axis() {
        let cells = header(&["symbol", "sample", "gene", "value"]);
        let mut resolver = AxisResolver::discovered(AxisKind::Row, &cells, vec![2, 0]);

        assert_eq!(resolver.resolve(&rec(&["TP53s", "s1", "TP53", "1"])), Some(0));
        assert_eq!(resolver.resolve(&rec(&["BRCAs", "s1", "BRCA1", "2"])), Some(1));
        assert_eq!(resolver.resolve(&rec(&["other", "s2", "TP53", "3"])), Some(0));
        assert_eq!(resolver.resolve(&rec(&["x", "s2"])), None);

        let (axis, index) = resolver.finish();
        assert_eq!(axis.header(), ["gene", "symbol"]);
        assert_eq!(axis.key_index(), 0);
        assert_eq!(axis.len(), 2);
        assert_eq!(axis.attribute(0, 1), Some("TP53s"));
        assert_eq!(index.keys(), ["TP53", "BRCA1"]);
    }

    #[test]
    fn test_declared_resolver_looks_up_only() {
        let table = Table::from_parts(header(&["id"]), vec![Some(rec(&["r1"]))]);
        let (axis, index, _) = index_declared(AxisKind::Row, &table, 0);
        let mut resolver = AxisResolver::declared(axis, index, 1);

        assert_eq!(resolver.resolve(&rec(&["c", "r1"])), Some(0));
        assert_eq!(resolver.resolve(&rec(&["c", "r9"])), None);

        let (axis, index) = resolver.finish();
        assert_eq!(axis.len(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_for_plan_requires_matching_source() {
        let cells = header(&["c", "r", "v"]);
        let plan = AxisPlan::Declared(KeyBinding {
            values_key: 1,
            axis_key: 0,
        });
        assert!(AxisResolver::for_plan(AxisKind::Row, &plan, &cells, None).is_none());

        let plan = AxisPlan::Discovered { fields: vec![1] };
        assert!(AxisResolver::for_plan(AxisKind::Row, &plan, &cells, None).is_some());
    }

    #[test]
    fn test_empty_discovered_plan_has_no_key() {
        let cells = header(&["c", "r", "v"]);
        let plan = AxisPlan::Discovered { fields: vec![] };
        assert_eq!(plan.values_key(), None);
        assert!(AxisResolver::for_plan(AxisKind::Row, &plan, &cells, None).is_none());

        let mut resolver = AxisResolver::discovered(AxisKind::Row, &cells, vec![]);
        assert_eq!(resolver.resolve(&rec(&["c1", "r1", "5"])), None);
    }

    #[test]
    fn test_scan_single_pass() {
        let cells = header(&["row", "col", "value"]);
        let records = vec![
            Some(rec(&["r1", "c1", "5"])),
            None,
            Some(rec(&["r2", "c1", "6"])),
            Some(rec(&["r1", "c2", "7"])),
            Some(vec![None, Some("c3".to_string()), Some("8".to_string())]),
        ];
        let mut rows = AxisResolver::discovered(AxisKind::Row, &cells, vec![0]);
        let mut cols = AxisResolver::discovered(AxisKind::Column, &cells, vec![1]);

        let scan = scan(&records, &mut rows, &mut cols);

        assert_eq!(scan.scanned, 4);
        assert_eq!(scan.gaps, 1);
        assert_eq!(scan.unresolved, 1);
        assert_eq!(
            scan.placements,
            vec![
                Placement { record: 0, row: 0, col: 0 },
                Placement { record: 2, row: 1, col: 0 },
                Placement { record: 3, row: 0, col: 1 },
            ]
        );

        let (row_axis, _) = rows.finish();
        let (col_axis, col_index) = cols.finish();
        assert_eq!(row_axis.len(), 2);
        // c3 is still registered even though its record had no row key
        assert_eq!(col_axis.len(), 3);
        assert_eq!(col_index.position("c3"), Some(2));
    }
}
