#![forbid(unsafe_code)]
//! emraster-mem: hard memory budgeting and budget-accounted cell buffers.
//!
//! Concrete implementations of the interfaces in `emraster-core::budget`.
//! Every block buffer the driver fills is acquired here first, so the number of
//! live bytes never exceeds the configured cap.

pub mod buffer;
pub mod error;
pub mod guard;
pub mod tracking;

pub use buffer::CellBuf;
pub use error::{Error, Result};
pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
pub use tracking::PeakTracker;
