//! Scoped read/write access to a raster's store.
//!
//! Opening a session opens the store; dropping it closes the store. Code that
//! bails out with `?` halfway through a block loop therefore still releases
//! every stream it opened.

use std::sync::Arc;

use emraster_core::block::{BlockPlan, RowBlock};

use crate::error::{StoreError, StoreResult};
use crate::raster::Raster;
use crate::store::{CellStore, StoreDims};

/// Open input stream over one raster.
pub struct ReadSession {
    store: Arc<dyn CellStore>,
    dims: StoreDims,
    open: bool,
}

impl ReadSession {
    pub(crate) fn open(store: Arc<dyn CellStore>) -> StoreResult<Self> {
        store.open_read()?;
        let dims = store.dims();
        Ok(Self {
            store,
            dims,
            open: true,
        })
    }

    pub fn dims(&self) -> StoreDims {
        self.dims
    }

    /// Read block `index` of `plan` as a layer-major flat sequence.
    pub fn read_block(&self, plan: &BlockPlan, index: usize) -> StoreResult<Vec<f64>> {
        let mut out = Vec::new();
        self.read_block_into(plan, index, &mut out)?;
        Ok(out)
    }

    /// Like `read_block`, appending into a caller-owned (budgeted) buffer.
    pub fn read_block_into(
        &self,
        plan: &BlockPlan,
        index: usize,
        out: &mut Vec<f64>,
    ) -> StoreResult<()> {
        let block = plan.get(index).ok_or_else(|| {
            StoreError::OutOfBounds(format!("block {index} of {}", plan.len()))
        })?;
        self.read_rows_into(block, out)
    }

    /// Read an arbitrary row window across all layers.
    pub fn read_rows_into(&self, block: RowBlock, out: &mut Vec<f64>) -> StoreResult<()> {
        for layer in 0..self.dims.nlyr {
            self.store
                .read_rows(layer, block.start_row, block.nrows, out)?;
        }
        Ok(())
    }

    /// Close explicitly, surfacing the close error.
    pub fn close(mut self) -> StoreResult<()> {
        self.open = false;
        self.store.close_read()
    }
}

impl Drop for ReadSession {
    fn drop(&mut self) {
        if self.open {
            let _ = self.store.close_read();
        }
    }
}

/// Open output stream. Blocks must be written exactly once each, in plan order.
pub struct WriteSession<'a> {
    raster: &'a mut Raster,
    store: Arc<dyn CellStore>,
    plan: BlockPlan,
    next: usize,
    open: bool,
}

impl<'a> WriteSession<'a> {
    pub(crate) fn open(
        raster: &'a mut Raster,
        store: Arc<dyn CellStore>,
        plan: BlockPlan,
    ) -> StoreResult<Self> {
        store.open_write()?;
        Ok(Self {
            raster,
            store,
            plan,
            next: 0,
            open: true,
        })
    }

    /// The block plan derived when the stream opened.
    pub fn plan(&self) -> &BlockPlan {
        &self.plan
    }

    /// Index of the next block to write.
    pub fn next_block(&self) -> usize {
        self.next
    }

    /// Write block `index` (full width, all layers).
    pub fn write_block(&mut self, index: usize, cells: &[f64]) -> StoreResult<()> {
        let block = self.plan.get(index).unwrap_or_else(|| {
            panic!(
                "block {index} is outside the plan ({} blocks)",
                self.plan.len()
            )
        });
        let ncol = self.store.dims().ncol;
        self.write_values(cells, block.start_row, block.nrows, 0, ncol)
    }

    /// Write a layer-major `nrows` x `ncols` window starting at `start_row` /
    /// `col_offset`. The row range must be the next block of the plan.
    ///
    /// # Panics
    /// When blocks are skipped, repeated or written out of order.
    pub fn write_values(
        &mut self,
        cells: &[f64],
        start_row: usize,
        nrows: usize,
        col_offset: usize,
        ncols: usize,
    ) -> StoreResult<()> {
        let expected = self.plan.get(self.next).unwrap_or_else(|| {
            panic!(
                "write past the end of the block plan ({} blocks)",
                self.plan.len()
            )
        });
        assert!(
            expected.start_row == start_row && expected.nrows == nrows,
            "blocks must be written once each in plan order: expected rows {:?}, got {}..{}",
            expected.rows(),
            start_row,
            start_row + nrows
        );

        let nlyr = self.store.dims().nlyr;
        let per_layer = nrows * ncols;
        if cells.len() != per_layer * nlyr {
            return Err(StoreError::Shape(format!(
                "{} cells for {nlyr} layers of {nrows}x{ncols}",
                cells.len()
            )));
        }
        for layer in 0..nlyr {
            let slice = &cells[layer * per_layer..(layer + 1) * per_layer];
            self.store
                .write_rows(layer, start_row, nrows, col_offset, ncols, slice)?;
        }
        self.next += 1;
        Ok(())
    }

    /// Close the stream and mark the raster as carrying values.
    ///
    /// # Panics
    /// When some planned block was never written.
    pub fn finish(mut self) -> StoreResult<()> {
        assert!(
            self.next == self.plan.len(),
            "stream closed after {} of {} blocks",
            self.next,
            self.plan.len()
        );
        self.open = false;
        self.store.close_write()?;
        self.raster.mark_complete();
        Ok(())
    }
}

impl Drop for WriteSession<'_> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.store.close_write();
        }
    }
}
