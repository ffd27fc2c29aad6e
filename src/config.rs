//! Reconciliation options.
//!
//! [`ReconcileOptions`] is created once at the boundary (builder calls, a
//! JSON file, or CLI flags) and passed by reference into the engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    reader::{single_byte, TextTableReader},
    table::AxisKind,
};

/// Row key field used in discovery mode when no row fields are configured.
pub const DEFAULT_DISCOVERY_ROW_KEY_INDEX: usize = 1;

/// Column key field used in discovery mode when no column fields are
/// configured.
pub const DEFAULT_DISCOVERY_COL_KEY_INDEX: usize = 0;

/// Default field separator.
pub const DEFAULT_SEPARATOR: char = '\t';

/// How row and column identity is established.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Row and/or column annotation tables are supplied; the join key of each
    /// supplied axis is the first of its fields also found in the cell
    /// header. An axis without a table falls back to discovery.
    Declared,

    /// **Default:** both axes are synthesized from the cell table.
    #[default]
    Discovery,

    /// The cell table is already one record per row and one field per
    /// column.
    WideFormat,
}

impl JoinMode {
    /// Parses a mode name as used on the command line.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "declared" => Ok(Self::Declared),
            "discovery" => Ok(Self::Discovery),
            "wide" | "wide_format" => Ok(Self::WideFormat),
            other => Err(Error::invalid_config(format!(
                "unknown join mode '{other}' (expected declared, discovery or wide)"
            ))),
        }
    }
}

/// Options controlling key inference and assembly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Reconciliation variant.
    pub join_mode: JoinMode,
    /// Cell-header fields relocated into a discovered row axis; the first is
    /// the row key.
    pub row_annotation_fields: Option<Vec<usize>>,
    /// Cell-header fields relocated into a discovered column axis; the first
    /// is the column key.
    pub col_annotation_fields: Option<Vec<usize>>,
    /// Field separator for text sources.
    pub separator: char,
    /// Row key field when `row_annotation_fields` is absent.
    pub discovery_row_key_index: usize,
    /// Column key field when `col_annotation_fields` is absent.
    pub discovery_col_key_index: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            join_mode: JoinMode::default(),
            row_annotation_fields: None,
            col_annotation_fields: None,
            separator: DEFAULT_SEPARATOR,
            discovery_row_key_index: DEFAULT_DISCOVERY_ROW_KEY_INDEX,
            discovery_col_key_index: DEFAULT_DISCOVERY_COL_KEY_INDEX,
        }
    }
}

impl ReconcileOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from a JSON string. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the options are invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_config(format!("bad options JSON: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds invalid options.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        Self::from_json_str(&json)
    }

    /// Sets the join mode.
    #[must_use]
    pub fn with_join_mode(mut self, join_mode: JoinMode) -> Self {
        self.join_mode = join_mode;
        self
    }

    /// Sets the cell fields relocated into the row axis.
    #[must_use]
    pub fn with_row_annotation_fields(mut self, fields: Vec<usize>) -> Self {
        self.row_annotation_fields = Some(fields);
        self
    }

    /// Sets the cell fields relocated into the column axis.
    #[must_use]
    pub fn with_col_annotation_fields(mut self, fields: Vec<usize>) -> Self {
        self.col_annotation_fields = Some(fields);
        self
    }

    /// Sets the field separator.
    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Sets the positional key defaults used by discovery.
    #[must_use]
    pub fn with_discovery_keys(mut self, row: usize, col: usize) -> Self {
        self.discovery_row_key_index = row;
        self.discovery_col_key_index = col;
        self
    }

    /// Returns the cell fields a discovered axis is built from. The first
    /// entry is the key.
    pub fn discovery_fields(&self, kind: AxisKind) -> Vec<usize> {
        let (configured, default) = match kind {
            AxisKind::Row => (&self.row_annotation_fields, self.discovery_row_key_index),
            AxisKind::Column => (&self.col_annotation_fields, self.discovery_col_key_index),
        };
        configured.clone().unwrap_or_else(|| vec![default])
    }

    /// Returns a text reader using the configured separator.
    pub fn reader(&self) -> TextTableReader {
        TextTableReader::new().with_separator(self.separator)
    }

    /// Checks the options for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when:
    /// - wide format is combined with annotation field lists
    /// - a field list is empty or repeats an index
    /// - the row and column lists share an index
    /// - the separator is not a single byte, or is a quote or line break
    pub fn validate(&self) -> Result<()> {
        single_byte(self.separator, "separator")?;
        if matches!(self.separator, '"' | '\n' | '\r') {
            return Err(Error::invalid_config(format!(
                "separator {:?} is not allowed",
                self.separator
            )));
        }

        if self.join_mode == JoinMode::WideFormat
            && (self.row_annotation_fields.is_some() || self.col_annotation_fields.is_some())
        {
            return Err(Error::invalid_config(
                "wide format takes no annotation field lists",
            ));
        }

        for (kind, fields) in [
            (AxisKind::Row, &self.row_annotation_fields),
            (AxisKind::Column, &self.col_annotation_fields),
        ] {
            let Some(fields) = fields else { continue };
            if fields.is_empty() {
                return Err(Error::invalid_config(format!(
                    "{kind} annotation field list is empty"
                )));
            }
            let mut seen = fields.clone();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != fields.len() {
                return Err(Error::invalid_config(format!(
                    "{kind} annotation field list repeats an index: {fields:?}"
                )));
            }
        }

        if self.join_mode == JoinMode::Discovery {
            let rows = self.discovery_fields(AxisKind::Row);
            let cols = self.discovery_fields(AxisKind::Column);
            if let Some(shared) = rows.iter().find(|i| cols.contains(i)) {
                return Err(Error::invalid_config(format!(
                    "field {shared} is claimed by both the row and column axis"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ReconcileOptions::default();
        assert_eq!(options.join_mode, JoinMode::Discovery);
        assert_eq!(options.separator, '\t');
        assert_eq!(options.discovery_row_key_index, 1);
        assert_eq!(options.discovery_col_key_index, 0);
        assert!(options.row_annotation_fields.is_none());
        assert!(options.col_annotation_fields.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_discovery_fields_default_and_configured() {
        let options = ReconcileOptions::new();
        assert_eq!(options.discovery_fields(AxisKind::Row), vec![1]);
        assert_eq!(options.discovery_fields(AxisKind::Column), vec![0]);

        let options = options.with_row_annotation_fields(vec![2, 3]);
        assert_eq!(options.discovery_fields(AxisKind::Row), vec![2, 3]);
    }

    #[test]
    fn test_builder() {
        let options = ReconcileOptions::new()
            .with_join_mode(JoinMode::Declared)
            .with_separator(',')
            .with_discovery_keys(0, 1)
            .with_col_annotation_fields(vec![4]);

        assert_eq!(options.join_mode, JoinMode::Declared);
        assert_eq!(options.separator, ',');
        assert_eq!(options.discovery_row_key_index, 0);
        assert_eq!(options.discovery_col_key_index, 1);
        assert_eq!(options.col_annotation_fields, Some(vec![4]));
    }

    #[test]
    fn test_validate_wide_rejects_fields() {
        let options = ReconcileOptions::new()
            .with_join_mode(JoinMode::WideFormat)
            .with_row_annotation_fields(vec![0]);
        assert!(matches!(
            options.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_empty_list() {
        let options = ReconcileOptions::new().with_col_annotation_fields(vec![]);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_repeated_index() {
        let options = ReconcileOptions::new().with_row_annotation_fields(vec![1, 2, 1]);
        let err = options.validate().err();
        assert!(err.is_some_and(|e| e.to_string().contains("repeats")));
    }

    #[test]
    fn test_validate_overlap() {
        let options = ReconcileOptions::new().with_discovery_keys(2, 2);
        let err = options.validate().err();
        assert!(err.is_some_and(|e| e.to_string().contains("both")));
    }

    #[test]
    fn test_validate_bad_separator() {
        let options = ReconcileOptions::new().with_separator('"');
        assert!(options.validate().is_err());

        let options = ReconcileOptions::new().with_separator('é');
        assert!(matches!(options.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_json_partial() {
        let options = ReconcileOptions::from_json_str(
            r#"{"join_mode": "wide_format", "separator": ","}"#,
        )
        .ok()
        .unwrap_or_else(|| panic!("Should parse options"));

        assert_eq!(options.join_mode, JoinMode::WideFormat);
        assert_eq!(options.separator, ',');
        assert_eq!(options.discovery_row_key_index, 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let options = ReconcileOptions::new()
            .with_row_annotation_fields(vec![0, 3])
            .with_col_annotation_fields(vec![1]);
        let json = serde_json::to_string(&options)
            .ok()
            .unwrap_or_else(|| panic!("Should serialize"));
        let back = ReconcileOptions::from_json_str(&json)
            .ok()
            .unwrap_or_else(|| panic!("Should parse"));
        assert_eq!(back, options);
    }

    #[test]
    fn test_json_invalid() {
        assert!(ReconcileOptions::from_json_str("{not json").is_err());
        assert!(ReconcileOptions::from_json_str(r#"{"join_mode": "sideways"}"#).is_err());
    }

    #[test]
    fn test_join_mode_parse() {
        assert_eq!(JoinMode::parse("declared").ok(), Some(JoinMode::Declared));
        assert_eq!(JoinMode::parse("discovery").ok(), Some(JoinMode::Discovery));
        assert_eq!(JoinMode::parse("wide").ok(), Some(JoinMode::WideFormat));
        assert!(JoinMode::parse("long").is_err());
    }

    #[test]
    fn test_from_json_path_missing() {
        assert!(ReconcileOptions::from_json_path("/nonexistent/options.json").is_err());
    }
}
