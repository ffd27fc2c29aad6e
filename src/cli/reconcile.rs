//! The `reconcile` command.

use std::path::{Path, PathBuf};

use super::basic::{is_parquet, load_table};
use crate::{
    export::{write_csv, write_parquet},
    reader::single_byte,
    Error, JoinMode, ReconcileOptions, ReconciledMatrix, Reconciler,
};

/// Arguments of `heatmatrix reconcile`.
pub(crate) struct ReconcileArgs {
    pub cells: PathBuf,
    pub rows: Option<PathBuf>,
    pub cols: Option<PathBuf>,
    pub mode: Option<String>,
    pub row_fields: Option<Vec<usize>>,
    pub col_fields: Option<Vec<usize>>,
    pub separator: Option<char>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub long: bool,
    pub field: usize,
    pub format: String,
}

/// Merge the JSON config file (if any) with command-line overrides.
pub(crate) fn build_options(args: &ReconcileArgs) -> crate::Result<ReconcileOptions> {
    let mut options = match &args.config {
        Some(path) => ReconcileOptions::from_json_path(path)?,
        None => ReconcileOptions::new(),
    };

    if let Some(mode) = &args.mode {
        options = options.with_join_mode(JoinMode::parse(mode)?);
    } else if args.config.is_none() && (args.rows.is_some() || args.cols.is_some()) {
        options = options.with_join_mode(JoinMode::Declared);
    }
    if let Some(fields) = &args.row_fields {
        options = options.with_row_annotation_fields(fields.clone());
    }
    if let Some(fields) = &args.col_fields {
        options = options.with_col_annotation_fields(fields.clone());
    }
    if let Some(separator) = args.separator {
        options = options.with_separator(separator);
    }

    options.validate()?;
    Ok(options)
}

#[cfg(feature = "tokio-runtime")]
fn load_and_reconcile(
    reconciler: Reconciler,
    args: &ReconcileArgs,
) -> crate::Result<ReconciledMatrix> {
    use crate::{async_load::reconcile_paths, LoadCoordinator};

    let any_parquet = [Some(&args.cells), args.rows.as_ref(), args.cols.as_ref()]
        .into_iter()
        .flatten()
        .any(|p| is_parquet(p));
    if any_parquet {
        return load_sequential(&reconciler, args);
    }

    let reader = reconciler.options().reader();
    let coordinator = LoadCoordinator::new(reconciler);
    let runtime = tokio::runtime::Runtime::new().map_err(Error::io_no_path)?;
    runtime.block_on(reconcile_paths(
        &coordinator,
        &reader,
        args.rows.as_deref(),
        args.cols.as_deref(),
        &args.cells,
    ))
}

#[cfg(not(feature = "tokio-runtime"))]
fn load_and_reconcile(
    reconciler: Reconciler,
    args: &ReconcileArgs,
) -> crate::Result<ReconciledMatrix> {
    load_sequential(&reconciler, args)
}

fn load_sequential(
    reconciler: &Reconciler,
    args: &ReconcileArgs,
) -> crate::Result<ReconciledMatrix> {
    let reader = reconciler.options().reader();
    let load = |path: &PathBuf| load_table(path, &reader);

    let rows = args.rows.as_ref().map(load).transpose()?;
    let cols = args.cols.as_ref().map(load).transpose()?;
    let cells = load(&args.cells)?;
    reconciler.reconcile(rows, cols, cells)
}

fn export(
    matrix: &ReconciledMatrix,
    args: &ReconcileArgs,
    path: &Path,
    separator: char,
) -> crate::Result<()> {
    let batch = if args.long {
        matrix.to_long_batch()?
    } else {
        matrix.to_wide_batch(args.field)?
    };

    if is_parquet(path) {
        return write_parquet(&batch, path);
    }
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => b',',
        Some("tsv") => b'\t',
        _ => single_byte(separator, "separator")?,
    };
    write_csv(&batch, path, delimiter)
}

fn print_summary(matrix: &ReconciledMatrix, format: &str) -> crate::Result<()> {
    let report = matrix.report();
    if format == "json" {
        let json = serde_json::json!({
            "mode": matrix.mode(),
            "rows": matrix.row_count(),
            "columns": matrix.column_count(),
            "missing": matrix.cells().missing_count(),
            "report": report,
        });
        let text = serde_json::to_string_pretty(&json)
            .map_err(|e| Error::invalid_config(format!("cannot render summary: {e}")))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Mode: {:?}", matrix.mode());
    println!(
        "Matrix: {} rows x {} columns",
        matrix.row_count(),
        matrix.column_count()
    );
    println!("Row header: {}", matrix.rows().header().join(", "));
    println!("Column header: {}", matrix.columns().header().join(", "));
    println!("Value fields: {}", matrix.cells().header().join(", "));
    println!("Missing cells: {}", matrix.cells().missing_count());
    println!();
    println!("Records scanned: {}", report.records_scanned);
    println!("Placed: {}", report.placed);
    println!("Overwritten: {}", report.overwritten);
    println!("Unresolved: {}", report.unresolved);
    println!("Dimension mismatches: {}", report.dimension_mismatches);
    println!("Duplicate axis keys: {}", report.duplicate_axis_keys);
    println!("Unkeyed axis records: {}", report.unkeyed_axis_records);
    println!("Key conflicts: {}", report.key_conflicts);
    Ok(())
}

/// Reconcile the given tables and report on the result.
pub(crate) fn cmd_reconcile(args: &ReconcileArgs) -> crate::Result<()> {
    let options = build_options(args)?;
    let separator = options.separator;
    let matrix = load_and_reconcile(Reconciler::new(options)?, args)?;

    print_summary(&matrix, &args.format)?;

    if let Some(output) = &args.output {
        export(&matrix, args, output, separator)?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}
