//! `Raster`: geometry, layer count, optional cell store and error state.
//!
//! A raster without a store (or whose write never finished) is a *shell*: it
//! describes a grid but has no values. A raster carrying an error is inert;
//! the arithmetic engine refuses to read from it.

use std::path::Path;
use std::sync::Arc;

use emraster_core::error::Error;
use emraster_core::geometry::{Extent, Geometry};
use emraster_core::manifest::RunManifest;
use emraster_core::block::RowBlock;
use emraster_sched::plan_for;

use crate::error::{StoreError, StoreResult};
use crate::fs_store::{FileHeader, FileStore};
use crate::memory_store::MemoryStore;
use crate::options::{Destination, WriteOptions};
use crate::session::{ReadSession, WriteSession};
use crate::store::{CellStore, StoreDims};

#[derive(Debug, Clone)]
pub struct Raster {
    geometry: Geometry,
    nlyr: usize,
    store: Option<Arc<dyn CellStore>>,
    complete: bool,
    error: Option<Error>,
    manifest: Option<RunManifest>,
}

impl Raster {
    /// Shell with no values.
    pub fn empty(geometry: Geometry, nlyr: usize) -> Self {
        Self {
            geometry,
            nlyr,
            store: None,
            complete: false,
            error: None,
            manifest: None,
        }
    }

    /// In-memory raster from per-layer cell vectors (row-major each).
    pub fn from_layers(geometry: Geometry, layers: Vec<Vec<f64>>) -> StoreResult<Self> {
        let nlyr = layers.len();
        let store = MemoryStore::from_layers(geometry.nrow, geometry.ncol, layers)?;
        Self::with_store(geometry, nlyr, Arc::new(store))
    }

    /// In-memory raster from one layer-major flat vector.
    pub fn from_values(geometry: Geometry, nlyr: usize, values: Vec<f64>) -> StoreResult<Self> {
        let per_layer = geometry.ncell();
        if values.len() != per_layer * nlyr {
            return Err(StoreError::Shape(format!(
                "{} values for {nlyr} layers of {per_layer} cells",
                values.len()
            )));
        }
        let layers = if per_layer == 0 {
            vec![Vec::new(); nlyr]
        } else {
            values.chunks(per_layer).map(<[f64]>::to_vec).collect()
        };
        Self::from_layers(geometry, layers)
    }

    /// Raster over an existing store whose dims match `geometry` and `nlyr`.
    pub fn with_store(
        geometry: Geometry,
        nlyr: usize,
        store: Arc<dyn CellStore>,
    ) -> StoreResult<Self> {
        let want = StoreDims::new(geometry.nrow, geometry.ncol, nlyr);
        if store.dims() != want {
            return Err(StoreError::Shape(format!(
                "store {} is {:?}, raster needs {want:?}",
                store.location(),
                store.dims()
            )));
        }
        Ok(Self {
            store: Some(store),
            complete: true,
            ..Self::empty(geometry, nlyr)
        })
    }

    /// Open a file raster written by `FileStore`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let (store, header) = FileStore::open(path)?;
        Self::with_store(header.geometry, header.nlyr, Arc::new(store))
    }

    /// Same geometry, no values; optionally a different layer count.
    pub fn shell(&self, nlyr: Option<usize>) -> Raster {
        Raster::empty(self.geometry.clone(), nlyr.unwrap_or(self.nlyr))
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn nrow(&self) -> usize {
        self.geometry.nrow
    }

    pub fn ncol(&self) -> usize {
        self.geometry.ncol
    }

    pub fn nlyr(&self) -> usize {
        self.nlyr
    }

    /// Cells per layer.
    pub fn ncell(&self) -> usize {
        self.geometry.ncell()
    }

    pub fn extent(&self) -> &Extent {
        &self.geometry.extent
    }

    pub fn crs(&self) -> &str {
        &self.geometry.crs
    }

    /// A finished store with at least one layer. Zero layers hold no cells
    /// to compute with.
    pub fn has_values(&self) -> bool {
        self.complete && self.store.is_some() && self.nlyr > 0
    }

    pub fn store(&self) -> Option<&Arc<dyn CellStore>> {
        self.store.as_ref()
    }

    /// Where the values live, if anywhere.
    pub fn source(&self) -> Option<String> {
        self.store.as_ref().map(|s| s.location())
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: Error) {
        self.error = Some(error);
    }

    pub fn manifest(&self) -> Option<&RunManifest> {
        self.manifest.as_ref()
    }

    pub fn set_manifest(&mut self, manifest: RunManifest) {
        self.manifest = Some(manifest);
    }

    /// Rows and columns always; layer count and extent on request.
    pub fn compare_geometry(
        &self,
        other: &Raster,
        require_layers: bool,
        require_extent: bool,
    ) -> bool {
        if !self.geometry.same_dims(&other.geometry) {
            return false;
        }
        if require_layers && self.nlyr != other.nlyr {
            return false;
        }
        if require_extent && self.geometry.extent != other.geometry.extent {
            return false;
        }
        true
    }

    /// Open an input stream.
    pub fn read_start(&self) -> StoreResult<ReadSession> {
        match &self.store {
            Some(store) if self.complete => ReadSession::open(Arc::clone(store)),
            _ => Err(StoreError::NoValues),
        }
    }

    /// Open an output stream at `opts.destination` and derive the block plan.
    pub fn write_start(&mut self, opts: &WriteOptions) -> StoreResult<WriteSession<'_>> {
        let dims = StoreDims::new(self.nrow(), self.ncol(), self.nlyr);
        let store: Arc<dyn CellStore> = match &opts.destination {
            Destination::Memory => Arc::new(MemoryStore::new(dims.nrow, dims.ncol, dims.nlyr)),
            Destination::File(path) => Arc::new(FileStore::create(
                path,
                &FileHeader::new(self.geometry.clone(), self.nlyr),
                opts.overwrite,
            )?),
            Destination::Store(store) => {
                if store.dims() != dims {
                    return Err(StoreError::Shape(format!(
                        "destination {} is {:?}, output needs {dims:?}",
                        store.location(),
                        store.dims()
                    )));
                }
                Arc::clone(store)
            }
        };

        let stream_layers = if opts.stream_layers.is_empty() {
            vec![self.nlyr]
        } else {
            opts.stream_layers.clone()
        };
        let plan = plan_for(
            dims.nrow,
            dims.ncol,
            &stream_layers,
            opts.mem_cap_bytes,
            opts.rows_per_block,
        );
        #[cfg(debug_assertions)]
        emraster_sched::verify::assert_plan(&plan, dims.nrow);

        self.store = Some(Arc::clone(&store));
        self.complete = false;
        WriteSession::open(self, store, plan)
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// All cells, layer-major. Reads the whole raster at once.
    pub fn values(&self) -> StoreResult<Vec<f64>> {
        let reader = self.read_start()?;
        let mut out = Vec::with_capacity(self.ncell() * self.nlyr);
        reader.read_rows_into(RowBlock::new(0, self.nrow()), &mut out)?;
        reader.close()?;
        Ok(out)
    }

    /// Cells of one layer.
    pub fn layer_values(&self, layer: usize) -> StoreResult<Vec<f64>> {
        if layer >= self.nlyr {
            return Err(StoreError::OutOfBounds(format!(
                "layer {layer} of {}",
                self.nlyr
            )));
        }
        let all = self.values()?;
        let n = self.ncell();
        Ok(all[layer * n..(layer + 1) * n].to_vec())
    }
}
