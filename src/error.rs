//! Error types for heatmatrix.

use std::path::PathBuf;

use crate::table::AxisKind;

/// Result type alias for heatmatrix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or reconciling tables.
///
/// Only conditions that abort a reconciliation are errors. Records dropped
/// along the way (unresolved keys, wide-format rows with the wrong field
/// count) are tallied on [`AssemblyReport`](crate::AssemblyReport) instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error while reading a source.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Arrow error during export.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error during export.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// No field of the axis header matches a field of the cell header.
    #[error("No join key for {axis} axis: none of {axis_header:?} appear in the cell header")]
    KeyInference {
        /// The axis whose key could not be inferred.
        axis: AxisKind,
        /// The header that was searched.
        axis_header: Vec<String>,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Text could not be split into records.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// One-based line number where parsing failed.
        line: usize,
        /// Description of the parse error.
        message: String,
    },

    /// A source contained no header record.
    #[error("Table is empty: no header record")]
    EmptyTable,

    /// Assembly was requested before every required source was ready.
    #[error("Not ready: waiting for {missing:?}")]
    NotReady {
        /// Names of the sources that have not reported yet.
        missing: Vec<&'static str>,
    },

    /// A field index points past the end of a header.
    #[error("Field index {index} out of bounds for header with {len} fields")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The header length.
        len: usize,
    },

    /// A load answered a request that has since been superseded.
    #[error("Stale load: request {ticket} superseded by {current}")]
    StaleRequest {
        /// Generation carried by the late delivery.
        ticket: u64,
        /// Generation currently accepted by the coordinator.
        current: u64,
    },

    /// The load coordinator's shared state is unusable.
    #[error("Coordinator error: {message}")]
    Coordinator {
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create an I/O error without path context.
    pub fn io_no_path(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }

    /// Create a key inference error for the given axis.
    pub fn key_inference(axis: AxisKind, axis_header: &[String]) -> Self {
        Self::KeyInference {
            axis,
            axis_header: axis_header.to_vec(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a coordinator error.
    pub fn coordinator(message: impl Into<String>) -> Self {
        Self::Coordinator {
            message: message.into(),
        }
    }

    /// Create a parse error at a one-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io(io_err, "/path/to/cells.tsv");
        assert!(err.to_string().contains("/path/to/cells.tsv"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_io_error_without_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io_no_path(io_err);
        assert!(err.to_string().contains("None"));
    }

    #[test]
    fn test_key_inference_names_axis_and_header() {
        let header = vec!["gene".to_string(), "symbol".to_string()];
        let err = Error::key_inference(AxisKind::Row, &header);
        let msg = err.to_string();
        assert!(msg.contains("row"));
        assert!(msg.contains("gene"));
        assert!(msg.contains("symbol"));
    }

    #[test]
    fn test_invalid_config() {
        let err = Error::invalid_config("annotation fields overlap");
        assert!(err.to_string().contains("annotation fields overlap"));
    }

    #[test]
    fn test_parse_error_carries_line() {
        let err = Error::parse(7, "unterminated quote");
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains("unterminated quote"));
    }

    #[test]
    fn test_empty_table() {
        assert!(Error::EmptyTable.to_string().contains("empty"));
    }

    #[test]
    fn test_not_ready_lists_sources() {
        let err = Error::NotReady {
            missing: vec!["rows", "cells"],
        };
        let msg = err.to_string();
        assert!(msg.contains("rows"));
        assert!(msg.contains("cells"));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let err = Error::IndexOutOfBounds { index: 10, len: 5 };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn test_stale_request() {
        let err = Error::StaleRequest {
            ticket: 3,
            current: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'));
        assert!(msg.contains('4'));
    }
}
