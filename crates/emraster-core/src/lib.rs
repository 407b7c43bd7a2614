#![forbid(unsafe_code)]
//! emraster-core: shared vocabulary for the block-streaming raster engine.
//!
//! Geometry, block plans, error kinds, engine configuration, hashing and run
//! manifests live here. No I/O and no allocation policy: `emraster-mem` owns the
//! budget, `emraster-io` owns the stores, `emraster-exec` drives the pipeline.

pub mod block;
pub mod budget;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hash;
pub mod manifest;
pub mod prelude;

/// Engine version recorded in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of one stored cell in bytes (cells are `f64`).
pub const CELL_BYTES: usize = std::mem::size_of::<f64>();
