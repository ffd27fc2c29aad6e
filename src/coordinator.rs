//! Load coordination.
//!
//! The row, column and cell tables may load concurrently. Each loader hands
//! its finished [`Table`] to one [`LoadCoordinator`], which holds them until
//! every expected source has reported and then runs reconciliation once.
//!
//! Every request is tagged with a [`LoadTicket`]. Calling
//! [`LoadCoordinator::begin`] again supersedes all outstanding loads; their
//! late deliveries are discarded without touching the new request's state.

use std::sync::{Mutex, MutexGuard};

use log::debug;

use crate::{
    error::{Error, Result},
    matrix::ReconciledMatrix,
    reconcile::Reconciler,
    table::Table,
};

/// One of the three sources feeding a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Row annotation table.
    Rows,
    /// Column annotation table.
    Columns,
    /// Cell table.
    Cells,
}

impl Source {
    /// Returns the lowercase source name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rows => "rows",
            Self::Columns => "columns",
            Self::Cells => "cells",
        }
    }
}

/// Which annotation tables a request waits for. The cell table is always
/// expected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expected {
    /// Wait for a row annotation table.
    pub rows: bool,
    /// Wait for a column annotation table.
    pub columns: bool,
}

impl Expected {
    /// Waits for the cell table only.
    pub fn cells_only() -> Self {
        Self::default()
    }

    /// Waits for all three tables.
    pub fn all() -> Self {
        Self {
            rows: true,
            columns: true,
        }
    }

    fn includes(self, source: Source) -> bool {
        match source {
            Source::Rows => self.rows,
            Source::Columns => self.columns,
            Source::Cells => true,
        }
    }
}

/// Identifies one load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    /// Returns the request generation.
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Outcome of handing a table to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Stored for the current request.
    Accepted,
    /// Dropped because its request was superseded.
    Discarded,
}

#[derive(Debug, Default)]
struct Slots {
    generation: u64,
    expected: Expected,
    rows: Option<Table>,
    columns: Option<Table>,
    cells: Option<Table>,
    discarded: usize,
}

impl Slots {
    fn slot(&mut self, source: Source) -> &mut Option<Table> {
        match source {
            Source::Rows => &mut self.rows,
            Source::Columns => &mut self.columns,
            Source::Cells => &mut self.cells,
        }
    }

    fn pending(&self) -> Vec<&'static str> {
        [
            (Source::Rows, self.rows.is_some()),
            (Source::Columns, self.columns.is_some()),
            (Source::Cells, self.cells.is_some()),
        ]
        .into_iter()
        .filter(|&(source, filled)| self.expected.includes(source) && !filled)
        .map(|(source, _)| source.as_str())
        .collect()
    }

    fn check(&self, ticket: LoadTicket) -> Result<()> {
        if ticket.0 == self.generation {
            Ok(())
        } else {
            Err(Error::StaleRequest {
                ticket: ticket.0,
                current: self.generation,
            })
        }
    }
}

/// Collects source tables and assembles once all have arrived.
#[derive(Debug, Default)]
pub struct LoadCoordinator {
    reconciler: Reconciler,
    slots: Mutex<Slots>,
}

impl LoadCoordinator {
    /// Creates a coordinator that reconciles with `reconciler`.
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Returns the reconciler used at assembly time.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slots>> {
        self.slots
            .lock()
            .map_err(|_| Error::coordinator("Failed to acquire slot lock"))
    }

    /// Starts a new request, superseding any outstanding one.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator state is poisoned.
    pub fn begin(&self, expected: Expected) -> Result<LoadTicket> {
        let mut slots = self.lock()?;
        let generation = slots.generation + 1;
        let discarded = slots.discarded;
        *slots = Slots {
            generation,
            expected,
            discarded,
            ..Slots::default()
        };
        debug!("load request {generation} started, expecting {expected:?}");
        Ok(LoadTicket(generation))
    }

    /// Hands over a loaded table.
    ///
    /// A delivery for a superseded ticket is counted and discarded. A
    /// second delivery for the same source replaces the first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the request does not expect this
    /// source and [`Error::NotReady`] if the table was never loaded.
    pub fn deliver(&self, ticket: LoadTicket, source: Source, table: Table) -> Result<Delivery> {
        let mut slots = self.lock()?;
        if slots.check(ticket).is_err() {
            slots.discarded += 1;
            debug!(
                "discarded {} from request {}, current is {}",
                source.as_str(),
                ticket.0,
                slots.generation
            );
            return Ok(Delivery::Discarded);
        }
        if !slots.expected.includes(source) {
            return Err(Error::invalid_config(format!(
                "request {} does not expect a {} table",
                ticket.0,
                source.as_str()
            )));
        }
        if !table.is_ready() {
            return Err(Error::NotReady {
                missing: vec![source.as_str()],
            });
        }
        *slots.slot(source) = Some(table);
        Ok(Delivery::Accepted)
    }

    /// Returns the sources the current request is still waiting for.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator state is poisoned.
    pub fn pending(&self) -> Result<Vec<&'static str>> {
        Ok(self.lock()?.pending())
    }

    /// Returns true once every expected source has been delivered.
    pub fn is_ready(&self) -> bool {
        self.lock().is_ok_and(|slots| slots.pending().is_empty())
    }

    /// Returns how many deliveries were discarded as stale.
    pub fn discarded(&self) -> usize {
        self.lock().map(|slots| slots.discarded).unwrap_or(0)
    }

    /// Reconciles the delivered tables.
    ///
    /// The tables are taken out of the coordinator, so a request assembles
    /// at most once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRequest`] for a superseded ticket,
    /// [`Error::NotReady`] while a source is outstanding, and any
    /// reconciliation error.
    pub fn assemble(&self, ticket: LoadTicket) -> Result<ReconciledMatrix> {
        let (rows, columns, cells) = {
            let mut slots = self.lock()?;
            slots.check(ticket)?;
            let missing = slots.pending();
            if !missing.is_empty() {
                return Err(Error::NotReady { missing });
            }
            let Some(cells) = slots.cells.take() else {
                return Err(Error::NotReady {
                    missing: vec![Source::Cells.as_str()],
                });
            };
            (slots.rows.take(), slots.columns.take(), cells)
        };
        self.reconciler.reconcile(rows, columns, cells)
    }
}
