#![forbid(unsafe_code)]
//! emraster-io: the stream contract the arithmetic driver consumes.
//!
//! - `CellStore`: where a raster's cells live (`MemoryStore`, `FileStore`).
//! - `Raster`: geometry + layer count + optional store + error state.
//! - `ReadSession` / `WriteSession`: scoped access that closes its store on
//!   drop, so every exit path releases what it opened.

pub mod error;
pub mod fs_store;
pub mod memory_store;
pub mod options;
pub mod raster;
pub mod session;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use fs_store::{FileHeader, FileStore};
pub use memory_store::MemoryStore;
pub use options::{Destination, WriteOptions};
pub use raster::Raster;
pub use session::{ReadSession, WriteSession};
pub use store::{CellStore, StoreDims};
