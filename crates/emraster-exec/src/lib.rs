#![forbid(unsafe_code)]
//! emraster-exec: the arithmetic driver and the `Engine` entry points.
//!
//! One call = validate, plan, then stream blocks sequentially through the
//! recycler and operator kernels. Errors come back on the result raster, never
//! as panics, and every stream opened by a call is closed before it returns.

pub mod driver;
pub mod engine;
pub mod metrics;
pub mod operand;

pub use driver::{Driver, DriverState};
pub use engine::Engine;
pub use operand::Operand;
