//! Table model for heatmatrix.
//!
//! A [`Table`] is the raw shape every source arrives in: a header and an
//! ordered body of records. An [`Axis`] is the reconciled form of one matrix
//! dimension, one record per distinct row or column.

use std::fmt;

use arrow::{
    array::{Array, AsArray, RecordBatch},
    compute::cast,
    datatypes::DataType,
};

use crate::error::{Error, Result};

/// One record: an ordered sequence of fields, `None` meaning absent.
pub type Record = Vec<Option<String>>;

/// Returns the field at `index` as a string slice.
///
/// Absent fields and indices past the end of a short record both yield
/// `None`. An empty string is a real value.
pub fn field(record: &[Option<String>], index: usize) -> Option<&str> {
    record.get(index).and_then(|f| f.as_deref())
}

/// A header plus an ordered body of records.
///
/// Tables start empty and not ready, are populated by exactly one bulk
/// load, and are read-only afterwards. A `None` entry in the body is a gap
/// left by the producer; consumers skip it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    records: Vec<Option<Record>>,
    ready: bool,
}

impl Table {
    /// Creates an empty table that is not ready yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ready table from a header and a body.
    pub fn from_parts(header: Vec<String>, records: Vec<Option<Record>>) -> Self {
        Self {
            header,
            records,
            ready: true,
        }
    }

    /// Creates a ready table from plain string rows, the first being the
    /// header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTable`] if `rows` yields nothing.
    pub fn from_rows<I, R, S>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rows = rows.into_iter();
        let header: Vec<String> = rows
            .next()
            .ok_or(Error::EmptyTable)?
            .into_iter()
            .map(Into::into)
            .collect();
        let records = rows
            .map(|row| Some(row.into_iter().map(|f| Some(f.into())).collect()))
            .collect();
        Ok(Self::from_parts(header, records))
    }

    /// Creates a ready table from an Arrow batch, casting every column to
    /// text. Nulls become absent fields.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be cast to Utf8.
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let header = schema.fields().iter().map(|f| f.name().clone()).collect();

        let columns = batch
            .columns()
            .iter()
            .map(|column| cast(column, &DataType::Utf8))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Arrow)?;

        let records = (0..batch.num_rows())
            .map(|row| {
                let record = columns
                    .iter()
                    .map(|column| {
                        let strings = column.as_string::<i32>();
                        strings
                            .is_valid(row)
                            .then(|| strings.value(row).to_string())
                    })
                    .collect();
                Some(record)
            })
            .collect();

        Ok(Self::from_parts(header, records))
    }

    /// Bulk-loads an empty table and marks it ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the table was already loaded.
    pub fn load(&mut self, header: Vec<String>, records: Vec<Option<Record>>) -> Result<()> {
        if self.ready {
            return Err(Error::invalid_config("table is already loaded"));
        }
        self.header = header;
        self.records = records;
        self.ready = true;
        Ok(())
    }

    /// Returns the header field names.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Returns the body, gaps included.
    pub fn records(&self) -> &[Option<Record>] {
        &self.records
    }

    /// Consumes the table and returns its header and body.
    pub fn into_parts(self) -> (Vec<String>, Vec<Option<Record>>) {
        (self.header, self.records)
    }

    /// Returns the record at `index`, or `None` for a gap or out of range.
    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index).and_then(Option::as_ref)
    }

    /// Returns the position of the first header field named `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Returns the number of body entries, gaps included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the body has no entries.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true once the bulk load has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Which matrix dimension an axis describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    /// The row dimension.
    Row,
    /// The column dimension.
    Column,
}

impl AxisKind {
    /// Returns the lowercase name of the axis.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Column => "column",
        }
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciled matrix dimension.
///
/// Position `i` of the axis is row (or column) `i` of the matrix. The join
/// key lives at [`Axis::key_index`] of every record: index 0 for axes
/// synthesized from the cell table, the inferred field for declared axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    kind: AxisKind,
    header: Vec<String>,
    records: Vec<Record>,
    key_index: usize,
    annotation_fields: Vec<usize>,
    ready: bool,
}

impl Axis {
    pub(crate) fn new(kind: AxisKind, header: Vec<String>, key_index: usize) -> Self {
        let annotation_fields = (0..header.len()).collect();
        Self {
            kind,
            header,
            records: Vec::new(),
            key_index,
            annotation_fields,
            ready: false,
        }
    }

    pub(crate) fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.ready = true;
        self
    }

    /// Replaces the set of header fields drawn as annotations.
    ///
    /// Indices past the end of the header are ignored.
    #[must_use]
    pub fn with_annotation_fields(mut self, fields: Vec<usize>) -> Self {
        let len = self.header.len();
        self.annotation_fields = fields.into_iter().filter(|&i| i < len).collect();
        self
    }

    /// Returns which dimension this axis describes.
    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    /// Returns the attribute names.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Returns one record per position.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the header index holding the join key.
    pub fn key_index(&self) -> usize {
        self.key_index
    }

    /// Returns the header fields drawn as annotations.
    pub fn annotation_fields(&self) -> &[usize] {
        &self.annotation_fields
    }

    /// Returns the join key at `position`.
    pub fn key_at(&self, position: usize) -> Option<&str> {
        self.attribute(position, self.key_index)
    }

    /// Returns attribute `attr` of the record at `position`.
    pub fn attribute(&self, position: usize, attr: usize) -> Option<&str> {
        self.records.get(position).and_then(|r| field(r, attr))
    }

    /// Returns the number of positions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the axis has no positions.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true once the axis has been fully built.
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}
