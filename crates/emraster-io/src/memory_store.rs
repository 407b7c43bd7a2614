//! In-memory cell store.
//!
//! Default destination for results and the backing of rasters built from
//! vectors. Counts open sessions and written cells so callers (and tests) can
//! see that every stream was released.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};
use crate::store::{CellStore, StoreDims};

#[derive(Debug)]
pub struct MemoryStore {
    dims: StoreDims,
    layers: Mutex<Vec<Vec<f64>>>,
    readers: AtomicUsize,
    writers: AtomicUsize,
    cells_written: AtomicUsize,
}

impl MemoryStore {
    /// Store of `nlyr` layers filled with NA.
    pub fn new(nrow: usize, ncol: usize, nlyr: usize) -> Self {
        let dims = StoreDims::new(nrow, ncol, nlyr);
        Self::with_layers(dims, vec![vec![f64::NAN; dims.cells_per_layer()]; nlyr])
    }

    /// Store over existing layers; each must hold `nrow * ncol` cells.
    pub fn from_layers(nrow: usize, ncol: usize, layers: Vec<Vec<f64>>) -> StoreResult<Self> {
        let dims = StoreDims::new(nrow, ncol, layers.len());
        if let Some((i, l)) = layers
            .iter()
            .enumerate()
            .find(|(_, l)| l.len() != dims.cells_per_layer())
        {
            return Err(StoreError::Shape(format!(
                "layer {i} has {} cells, expected {}",
                l.len(),
                dims.cells_per_layer()
            )));
        }
        Ok(Self::with_layers(dims, layers))
    }

    fn with_layers(dims: StoreDims, layers: Vec<Vec<f64>>) -> Self {
        Self {
            dims,
            layers: Mutex::new(layers),
            readers: AtomicUsize::new(0),
            writers: AtomicUsize::new(0),
            cells_written: AtomicUsize::new(0),
        }
    }

    pub fn open_readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    pub fn open_writers(&self) -> usize {
        self.writers.load(Ordering::Acquire)
    }

    /// Cells written since creation.
    pub fn cells_written(&self) -> usize {
        self.cells_written.load(Ordering::Acquire)
    }

    /// Copy of every layer.
    pub fn snapshot(&self) -> StoreResult<Vec<Vec<f64>>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Vec<Vec<f64>>>> {
        self.layers.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn release(counter: &AtomicUsize, what: &'static str) -> StoreResult<()> {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .map(|_| ())
        .map_err(|_| StoreError::NotOpen(what))
}

impl CellStore for MemoryStore {
    fn location(&self) -> String {
        "memory://".to_string()
    }

    fn dims(&self) -> StoreDims {
        self.dims
    }

    fn open_read(&self) -> StoreResult<()> {
        self.readers.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn close_read(&self) -> StoreResult<()> {
        release(&self.readers, "reading")
    }

    fn open_write(&self) -> StoreResult<()> {
        self.writers
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| StoreError::AlreadyWriting)
    }

    fn close_write(&self) -> StoreResult<()> {
        release(&self.writers, "writing")
    }

    fn read_rows(
        &self,
        layer: usize,
        start_row: usize,
        nrows: usize,
        out: &mut Vec<f64>,
    ) -> StoreResult<()> {
        if self.open_readers() == 0 {
            return Err(StoreError::NotOpen("reading"));
        }
        self.dims
            .check_window(layer, start_row, nrows, 0, self.dims.ncol)?;
        let layers = self.lock()?;
        let from = start_row * self.dims.ncol;
        let to = from + nrows * self.dims.ncol;
        out.extend_from_slice(&layers[layer][from..to]);
        Ok(())
    }

    fn write_rows(
        &self,
        layer: usize,
        start_row: usize,
        nrows: usize,
        col_offset: usize,
        ncols: usize,
        values: &[f64],
    ) -> StoreResult<()> {
        if self.open_writers() == 0 {
            return Err(StoreError::NotOpen("writing"));
        }
        self.dims
            .check_window(layer, start_row, nrows, col_offset, ncols)?;
        if values.len() != nrows * ncols {
            return Err(StoreError::Shape(format!(
                "{} values for a {nrows}x{ncols} window",
                values.len()
            )));
        }
        let mut layers = self.lock()?;
        let ncol = self.dims.ncol;
        for (r, row) in values.chunks_exact(ncols.max(1)).enumerate().take(nrows) {
            let at = (start_row + r) * ncol + col_offset;
            layers[layer][at..at + ncols].copy_from_slice(row);
        }
        self.cells_written
            .fetch_add(values.len(), Ordering::AcqRel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_window() {
        let store = MemoryStore::new(3, 2, 1);
        store.open_write().unwrap();
        store.write_rows(0, 1, 2, 0, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        store.write_rows(0, 0, 1, 1, 1, &[9.0]).unwrap();
        store.close_write().unwrap();

        store.open_read().unwrap();
        let mut out = Vec::new();
        store.read_rows(0, 0, 3, &mut out).unwrap();
        store.close_read().unwrap();

        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[9.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(store.cells_written(), 5);
    }

    #[test]
    fn reads_require_open_session() {
        let store = MemoryStore::new(1, 1, 1);
        let mut out = Vec::new();
        assert!(matches!(
            store.read_rows(0, 0, 1, &mut out),
            Err(StoreError::NotOpen("reading"))
        ));
        assert!(matches!(store.close_read(), Err(StoreError::NotOpen(_))));
    }

    #[test]
    fn single_writer() {
        let store = MemoryStore::new(1, 1, 1);
        store.open_write().unwrap();
        assert!(matches!(store.open_write(), Err(StoreError::AlreadyWriting)));
        store.close_write().unwrap();
        assert_eq!(store.open_writers(), 0);
    }

    #[test]
    fn rejects_ragged_layers() {
        let err = MemoryStore::from_layers(2, 2, vec![vec![0.0; 4], vec![0.0; 3]]).unwrap_err();
        assert!(matches!(err, StoreError::Shape(_)));
    }
}
