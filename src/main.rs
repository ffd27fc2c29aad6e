//! heatmatrix CLI - reconcile annotation and cell tables into a matrix
//!
//! Command-line interface for heatmatrix operations.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;

fn main() -> ExitCode {
    heatmatrix::cli::run()
}
