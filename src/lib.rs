//! heatmatrix - Tabular Reconciliation and Matrix Assembly in Pure Rust
//!
//! Joins a cell table with optional row and column annotation tables and
//! produces a dense, row-major matrix addressed by `(row, column)` position,
//! ready for heatmap rendering, sorting and search.
//!
//! # Design Principles
//!
//! 1. **Strings in, strings out** - Fields are never coerced; join keys
//!    compare as text
//! 2. **Single pass** - Both axes are discovered while the cells are scanned
//! 3. **Fixed shape** - The dense array is allocated once and never resized
//! 4. **Ecosystem aligned** - Arrow 53, Parquet 53 for import and export
//!
//! # Quick Start
//!
//! ```no_run
//! use heatmatrix::{ReconcileOptions, Reconciler, TextTableReader};
//!
//! let reader = TextTableReader::new();
//! let cells = reader.read_path("data/cells.tsv").unwrap();
//!
//! // Rows keyed by field 1, columns by field 0 of each cell record
//! let matrix = Reconciler::new(ReconcileOptions::default())
//!     .unwrap()
//!     .reconcile(None, None, cells)
//!     .unwrap();
//!
//! for i in 0..matrix.row_count() {
//!     println!("{:?}: {:?}", matrix.row_key_at(i), matrix.value_field(i, 0, 0));
//! }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::redundant_clone,
        clippy::needless_collect,
        clippy::too_many_lines,
        clippy::similar_names
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::map_unwrap_or)]

pub mod assemble;
#[cfg(feature = "tokio-runtime")]
pub mod async_load;
/// CLI module for command-line interface
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod index;
pub mod keys;
pub mod matrix;
pub mod reader;
pub mod reconcile;
pub mod table;

// Re-exports for convenience
pub use arrow::array::RecordBatch;
pub use assemble::{assemble_wide, AssemblyReport, DenseCellMatrix, SparseCellInput, WideAssembly};
pub use config::{JoinMode, ReconcileOptions};
pub use coordinator::{Delivery, Expected, LoadCoordinator, LoadTicket, Source};
pub use error::{Error, Result};
pub use export::{write_csv, write_parquet};
pub use index::{index_declared, AxisIndex, IndexStats};
pub use keys::{infer_declared_key, infer_join_plan, AxisPlan, JoinPlan, KeyBinding, KeyMatch};
pub use matrix::ReconciledMatrix;
pub use reader::{read_parquet, TextTableReader};
pub use reconcile::{reconcile, Reconciler};
pub use table::{field, Axis, AxisKind, Record, Table};
