//! heatmatrix CLI - reconcile annotation and cell tables into a matrix
//!
//! Command-line interface for heatmatrix operations.

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use log::LevelFilter;

mod basic;
mod reconcile;

/// heatmatrix - Reconcile row, column and cell tables into a dense matrix
#[derive(Parser)]
#[command(name = "heatmatrix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug detail (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a matrix from a cell table and optional annotation tables
    Reconcile {
        /// Cell table (text or .parquet)
        #[arg(long)]
        cells: PathBuf,
        /// Row annotation table
        #[arg(long)]
        rows: Option<PathBuf>,
        /// Column annotation table
        #[arg(long)]
        cols: Option<PathBuf>,
        /// Join mode (declared, discovery, wide)
        #[arg(short, long)]
        mode: Option<String>,
        /// Cell fields forming a discovered row axis, key first
        #[arg(long, value_delimiter = ',')]
        row_fields: Option<Vec<usize>>,
        /// Cell fields forming a discovered column axis, key first
        #[arg(long, value_delimiter = ',')]
        col_fields: Option<Vec<usize>>,
        /// Field separator for text inputs
        #[arg(short, long)]
        separator: Option<char>,
        /// JSON options file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the matrix to this file (.csv, .tsv or .parquet)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Export one row per present cell instead of a grid
        #[arg(long)]
        long: bool,
        /// Value field exported in grid layout
        #[arg(long, default_value = "0")]
        field: usize,
        /// Output format for the summary (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show the header and record counts of a table
    Inspect {
        /// Path to the table (text or .parquet)
        path: PathBuf,
        /// Field separator for text inputs
        #[arg(short, long)]
        separator: Option<char>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Run the heatmatrix CLI.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Reconcile {
            cells,
            rows,
            cols,
            mode,
            row_fields,
            col_fields,
            separator,
            config,
            output,
            long,
            field,
            format,
        } => reconcile::cmd_reconcile(&reconcile::ReconcileArgs {
            cells,
            rows,
            cols,
            mode,
            row_fields,
            col_fields,
            separator,
            config,
            output,
            long,
            field,
            format,
        }),
        Commands::Inspect { path, separator } => basic::cmd_inspect(&path, separator),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
