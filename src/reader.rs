//! Text and Parquet sources.
//!
//! [`TextTableReader`] splits delimited text into a ready [`Table`] with the
//! `csv` crate: one record per non-blank, non-comment line, fields separated
//! by a single byte, quoted fields allowed to hold the separator and line
//! breaks.
//!
//! Records keep their natural length. A record with more or fewer fields
//! than the header is preserved as-is so the assembler can decide what to
//! do with it.

use std::path::Path;

use arrow::array::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::{
    config::DEFAULT_SEPARATOR,
    error::{Error, Result},
    table::{Record, Table},
};

const UTF8_BOM: char = '\u{feff}';

/// Splits delimited text into tables.
///
/// # Example
///
/// ```
/// use heatmatrix::TextTableReader;
///
/// let table = TextTableReader::new()
///     .with_separator(',')
///     .read_str("gene,sample,value\nTP53,s1,0.5\n")
///     .unwrap();
/// assert_eq!(table.header(), ["gene", "sample", "value"]);
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTableReader {
    separator: char,
    comment: Option<char>,
    empty_as_absent: bool,
}

impl Default for TextTableReader {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            comment: Some('#'),
            empty_as_absent: false,
        }
    }
}

impl TextTableReader {
    /// Creates a tab-separated reader that skips `#` comment lines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field separator. It must be a single ASCII character.
    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Sets the character marking comment lines, or disables comments.
    #[must_use]
    pub fn with_comment(mut self, comment: Option<char>) -> Self {
        self.comment = comment;
        self
    }

    /// When set, empty fields become absent instead of `""`.
    #[must_use]
    pub fn with_empty_as_absent(mut self, empty_as_absent: bool) -> Self {
        self.empty_as_absent = empty_as_absent;
        self
    }

    /// Returns the field separator.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Parses a whole text into a table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the separator or comment character
    /// is not a single byte, [`Error::EmptyTable`] if no header record is
    /// found, or [`Error::Parse`] if the text cannot be split into records.
    pub fn read_str(&self, text: &str) -> Result<Table> {
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
        let comment = self
            .comment
            .map(|c| single_byte(c, "comment character"))
            .transpose()?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(single_byte(self.separator, "separator")?)
            .comment(comment)
            .from_reader(text.as_bytes());

        let mut header: Option<Vec<String>> = None;
        let mut records = Vec::new();
        let mut record = csv::StringRecord::new();

        while reader.read_record(&mut record).map_err(parse_error)? {
            if is_blank(&record) {
                continue;
            }
            if header.is_some() {
                records.push(Some(self.to_record(&record)));
            } else {
                header = Some(record.iter().map(str::to_string).collect());
            }
        }

        let header = header.ok_or(Error::EmptyTable)?;
        Ok(Table::from_parts(header, records))
    }

    /// Reads and parses a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        self.read_str(&text)
    }

    /// Reads and parses a file without blocking the runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[cfg(feature = "tokio-runtime")]
    pub async fn read_path_async(&self, path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io(e, path))?;
        self.read_str(&text)
    }

    fn to_record(&self, record: &csv::StringRecord) -> Record {
        record
            .iter()
            .map(|value| {
                if self.empty_as_absent && value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            })
            .collect()
    }
}

/// Converts a separator or comment character to the byte `csv` expects.
pub(crate) fn single_byte(c: char, role: &str) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::invalid_config(format!("{role} {c:?} is not a single byte")))
}

// A line holding only whitespace comes back as one whitespace field.
fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(|f| f.trim().is_empty())
}

fn parse_error(err: csv::Error) -> Error {
    let line = err.position().map_or(0, |p| p.line() as usize);
    Error::parse(line, err.to_string())
}

/// Loads a Parquet file into a single table, every column read as text.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not valid Parquet.
pub fn read_parquet(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(Error::Parquet)?;
    let schema = builder.schema().clone();
    let reader = builder.build().map_err(Error::Parquet)?;

    let batches: Vec<RecordBatch> = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::Arrow)?;

    let batch = arrow::compute::concat_batches(&schema, &batches).map_err(Error::Arrow)?;
    Table::from_record_batch(&batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Table {
        TextTableReader::new()
            .read_str(text)
            .ok()
            .unwrap_or_else(|| panic!("Should parse text"))
    }

    #[test]
    fn test_tab_separated() {
        let table = read("row\tcol\tvalue\nr1\tc1\t5\nr2\tc1\t6\n");
        assert_eq!(table.header(), ["row", "col", "value"]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.record(1),
            Some(&vec![
                Some("r2".to_string()),
                Some("c1".to_string()),
                Some("6".to_string())
            ])
        );
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let table = read("# exported 2024\nid\tv\n\n1\t2\n# trailing\n3\t4\n");
        assert_eq!(table.header(), ["id", "v"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_comment_disabled() {
        let table = TextTableReader::new()
            .with_comment(None)
            .read_str("#id\tv\n1\t2\n")
            .ok()
            .unwrap_or_else(|| panic!("Should parse text"));
        assert_eq!(table.header(), ["#id", "v"]);
    }

    #[test]
    fn test_quoted_field_holds_separator() {
        let table = TextTableReader::new()
            .with_separator(',')
            .read_str("name,desc\na,\"one, two\"\nb,\"say \"\"hi\"\"\"\n")
            .ok()
            .unwrap_or_else(|| panic!("Should parse text"));

        assert_eq!(
            table.record(0),
            Some(&vec![Some("a".to_string()), Some("one, two".to_string())])
        );
        assert_eq!(
            table.record(1),
            Some(&vec![Some("b".to_string()), Some("say \"hi\"".to_string())])
        );
    }

    #[test]
    fn test_quoted_field_holds_line_break() {
        let table = TextTableReader::new()
            .with_separator(',')
            .read_str("a,b\n\"x\ny\",1\n")
            .ok()
            .unwrap_or_else(|| panic!("Should parse text"));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.record(0),
            Some(&vec![Some("x\ny".to_string()), Some("1".to_string())])
        );
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        let table = read("\u{feff}gene\tsample\tv\nTP53\ts1\t1\n");
        assert_eq!(table.header(), ["gene", "sample", "v"]);
        assert_eq!(table.field_index("gene"), Some(0));
    }

    #[test]
    fn test_whitespace_line_skipped() {
        let table = read("a\tb\n   \n1\t2\n");
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.record(0),
            Some(&vec![Some("1".to_string()), Some("2".to_string())])
        );
    }

    #[test]
    fn test_multibyte_separator_rejected() {
        let result = TextTableReader::new().with_separator('§').read_str("a§b\n");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_empty_fields_kept_by_default() {
        let table = read("a\tb\tc\n\t\tx\n");
        assert_eq!(
            table.record(0),
            Some(&vec![Some(String::new()), Some(String::new()), Some("x".to_string())])
        );
    }

    #[test]
    fn test_empty_as_absent() {
        let table = TextTableReader::new()
            .with_separator(',')
            .with_empty_as_absent(true)
            .read_str("a,b,c\n,\"\",x\n")
            .ok()
            .unwrap_or_else(|| panic!("Should parse text"));
        assert_eq!(table.record(0), Some(&vec![None, None, Some("x".to_string())]));
    }

    #[test]
    fn test_ragged_records_preserved() {
        let table = read("Row\tc1\tc2\nr1\t1\nr2\t1\t2\t3\n");
        assert_eq!(table.record(0).map(Vec::len), Some(2));
        assert_eq!(table.record(1).map(Vec::len), Some(4));
    }

    #[test]
    fn test_crlf_line_endings() {
        let table = read("a\tb\r\n1\t2\r\n");
        assert_eq!(table.header(), ["a", "b"]);
        assert_eq!(
            table.record(0),
            Some(&vec![Some("1".to_string()), Some("2".to_string())])
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            TextTableReader::new().read_str("\n# only comments\n"),
            Err(Error::EmptyTable)
        ));
    }

    #[test]
    fn test_read_path_missing() {
        let result = TextTableReader::new().read_path("/nonexistent/cells.tsv");
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_read_path() {
        let temp_dir = tempfile::tempdir()
            .ok()
            .unwrap_or_else(|| panic!("Should create temp dir"));
        let path = temp_dir.path().join("rows.tsv");
        std::fs::write(&path, "id\tlabel\nr1\tFirst\n")
            .ok()
            .unwrap_or_else(|| panic!("Should write file"));

        let table = TextTableReader::new()
            .read_path(&path)
            .ok()
            .unwrap_or_else(|| panic!("Should read file"));
        assert!(table.is_ready());
        assert_eq!(table.field_index("label"), Some(1));
    }

    #[test]
    fn test_read_parquet_missing() {
        assert!(read_parquet("/nonexistent/cells.parquet").is_err());
    }
}
