#![forbid(unsafe_code)]
//! emraster-operators: the pure, synchronous half of raster arithmetic.
//!
//! - `op`: the fixed operator catalog with the NA rule applied in one place.
//! - `recycle`: cyclic extension of shorter operands.
//! - `kernel`: block-level loops the driver calls once per block.
//!
//! Nothing here touches stores or budgets; buffers are owned by the caller.

pub mod error;
pub mod kernel;
pub mod op;
pub mod recycle;

pub use error::OpError;
pub use kernel::{apply_cells, apply_per_layer, apply_scalar};
pub use op::ArithOp;
pub use recycle::{recycle, recycle_in_place, recycle_pair};
