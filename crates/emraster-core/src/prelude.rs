//! Convenient re-exports for downstream crates.

pub use crate::block::{BlockPlan, RowBlock};
pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::geometry::{Extent, Geometry};
pub use crate::hash::{CellDigest, Hash256};
pub use crate::manifest::{ManifestId, RunManifest};
