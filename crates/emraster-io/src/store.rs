//! Abstract cell storage behind a raster.
//!
//! Layout contract: a store holds `nlyr` layers of `nrow * ncol` cells. Reads
//! and writes address one layer and a row window at a time; the session layer
//! stitches layers into layer-major blocks.

use std::fmt;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDims {
    pub nrow: usize,
    pub ncol: usize,
    pub nlyr: usize,
}

impl StoreDims {
    pub const fn new(nrow: usize, ncol: usize, nlyr: usize) -> Self {
        Self { nrow, ncol, nlyr }
    }

    pub fn cells_per_layer(&self) -> usize {
        self.nrow * self.ncol
    }

    pub fn total_cells(&self) -> usize {
        self.cells_per_layer() * self.nlyr
    }

    /// Bounds-check a (layer, rows, columns) window.
    pub fn check_window(
        &self,
        layer: usize,
        start_row: usize,
        nrows: usize,
        col_offset: usize,
        ncols: usize,
    ) -> StoreResult<()> {
        if layer >= self.nlyr {
            return Err(StoreError::OutOfBounds(format!(
                "layer {layer} of {}",
                self.nlyr
            )));
        }
        if start_row + nrows > self.nrow {
            return Err(StoreError::OutOfBounds(format!(
                "rows {start_row}..{} of {}",
                start_row + nrows,
                self.nrow
            )));
        }
        if col_offset + ncols > self.ncol {
            return Err(StoreError::OutOfBounds(format!(
                "cols {col_offset}..{} of {}",
                col_offset + ncols,
                self.ncol
            )));
        }
        Ok(())
    }
}

/// Storage backend for one raster's cells.
///
/// Implementations must tolerate several concurrent readers and at most one
/// writer. `close_*` is called exactly once per successful `open_*`.
pub trait CellStore: Send + Sync + fmt::Debug {
    /// Human-readable location (`memory://`, a file path...).
    fn location(&self) -> String;

    fn dims(&self) -> StoreDims;

    fn open_read(&self) -> StoreResult<()>;
    fn close_read(&self) -> StoreResult<()>;

    fn open_write(&self) -> StoreResult<()>;
    fn close_write(&self) -> StoreResult<()>;

    /// Append `nrows` full rows of `layer`, starting at `start_row`, to `out`.
    fn read_rows(
        &self,
        layer: usize,
        start_row: usize,
        nrows: usize,
        out: &mut Vec<f64>,
    ) -> StoreResult<()>;

    /// Write a `nrows` x `ncols` window of `layer` (row-major `values`).
    fn write_rows(
        &self,
        layer: usize,
        start_row: usize,
        nrows: usize,
        col_offset: usize,
        ncols: usize,
        values: &[f64],
    ) -> StoreResult<()>;
}
