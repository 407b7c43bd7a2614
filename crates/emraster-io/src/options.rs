//! Per-call write options: where the output goes and how blocks are sized.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use emraster_core::config::EngineConfig;

use crate::store::CellStore;

#[derive(Clone)]
pub enum Destination {
    /// New `MemoryStore`.
    Memory,
    /// New `FileStore` at this path.
    File(PathBuf),
    /// Caller-supplied store; its dims must match the output raster.
    Store(Arc<dyn CellStore>),
}

impl Destination {
    /// `memory://...` (or empty) selects memory; `file://path` or a bare path
    /// selects a file.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.starts_with("memory://") {
            Destination::Memory
        } else if let Some(path) = s.strip_prefix("file://") {
            Destination::File(PathBuf::from(path))
        } else {
            Destination::File(PathBuf::from(s))
        }
    }

    /// Whether writing here would replace the cells held by `store`.
    pub fn overlaps(&self, store: &Arc<dyn CellStore>) -> bool {
        match self {
            Destination::Memory => false,
            Destination::File(path) => same_file(path, Path::new(&store.location())),
            Destination::Store(dest) => std::ptr::addr_eq(Arc::as_ptr(dest), Arc::as_ptr(store)),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Memory => write!(f, "Memory"),
            Destination::File(p) => f.debug_tuple("File").field(p).finish(),
            Destination::Store(s) => f.debug_tuple("Store").field(&s.location()).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub destination: Destination,
    pub overwrite: bool,
    /// Fixed rows per block; sized from `mem_cap_bytes` when `None`.
    pub rows_per_block: Option<usize>,
    pub mem_cap_bytes: usize,
    /// Layer counts of every buffer live per block. Empty means "just the
    /// output", which is what a plain copy needs.
    pub stream_layers: Vec<usize>,
}

impl WriteOptions {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            destination: Destination::parse(&cfg.destination),
            overwrite: cfg.overwrite,
            rows_per_block: cfg.block_rows_hint,
            mem_cap_bytes: cfg.mem_cap_bytes,
            stream_layers: Vec::new(),
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_rows_per_block(mut self, rows: usize) -> Self {
        self.rows_per_block = Some(rows);
        self
    }

    pub fn with_stream_layers(mut self, layers: Vec<usize>) -> Self {
        self.stream_layers = layers;
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
