//! Concurrent source loading on tokio.
//!
//! [`load_and_reconcile`] drives the row, column and cell loads at the same
//! time, hands each table to a [`LoadCoordinator`] as soon as it finishes,
//! and assembles once all of them are in.

use std::{future::Future, path::Path};

use crate::{
    coordinator::{Delivery, Expected, LoadCoordinator, LoadTicket, Source},
    error::Result,
    matrix::ReconciledMatrix,
    reader::TextTableReader,
    table::Table,
};

async fn fetch_and_deliver<F>(
    coordinator: &LoadCoordinator,
    ticket: LoadTicket,
    source: Source,
    load: Option<F>,
) -> Result<Option<Delivery>>
where
    F: Future<Output = Result<Table>>,
{
    match load {
        Some(load) => {
            let table = load.await?;
            coordinator.deliver(ticket, source, table).map(Some)
        }
        None => Ok(None),
    }
}

/// Loads up to three sources concurrently and reconciles them.
///
/// A new request is started on `coordinator`, so any load still running
/// for an earlier request is superseded. If this request is itself
/// superseded before every load finishes, the result is
/// [`Error::StaleRequest`](crate::Error::StaleRequest).
///
/// # Errors
///
/// Returns the first load error, or any assembly error.
///
/// # Example
///
/// ```
/// use heatmatrix::{async_load::load_and_reconcile, LoadCoordinator, Table};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let coordinator = LoadCoordinator::default();
/// let cells = async { Table::from_rows(vec![vec!["col", "row", "v"], vec!["c1", "r1", "1"]]) };
///
/// let matrix = load_and_reconcile(&coordinator, None, None, cells).await.unwrap();
/// assert_eq!(matrix.row_key_at(0), Some("r1"));
/// # }
/// ```
pub async fn load_and_reconcile<F>(
    coordinator: &LoadCoordinator,
    rows: Option<F>,
    columns: Option<F>,
    cells: F,
) -> Result<ReconciledMatrix>
where
    F: Future<Output = Result<Table>>,
{
    let ticket = coordinator.begin(Expected {
        rows: rows.is_some(),
        columns: columns.is_some(),
    })?;

    let (rows, columns, cells) = tokio::join!(
        fetch_and_deliver(coordinator, ticket, Source::Rows, rows),
        fetch_and_deliver(coordinator, ticket, Source::Columns, columns),
        fetch_and_deliver(coordinator, ticket, Source::Cells, Some(cells)),
    );
    rows?;
    columns?;
    cells?;

    coordinator.assemble(ticket)
}

/// Reads text files concurrently and reconciles them.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed, or assembly fails.
pub async fn reconcile_paths(
    coordinator: &LoadCoordinator,
    reader: &TextTableReader,
    rows: Option<&Path>,
    columns: Option<&Path>,
    cells: &Path,
) -> Result<ReconciledMatrix> {
    let read = |path: &Path| reader.read_path_async(path.to_path_buf());
    load_and_reconcile(coordinator, rows.map(read), columns.map(read), read(cells)).await
}
