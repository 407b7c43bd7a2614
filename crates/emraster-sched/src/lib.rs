#![forbid(unsafe_code)]
//! emraster-sched: row-block planning under a memory cap.
//!
//! Responsibilities:
//! - Estimate the live bytes one row costs across every buffered stream.
//! - Choose rows-per-block so one block of every stream fits the cap.
//! - Partition the grid rows into an ordered, non-overlapping `BlockPlan`.
//! - Verify plans in tests and debug builds.
//!
//! **No I/O, no async** here. The io crate asks for a plan when a write opens.

pub mod cost;
pub mod plan;
pub mod schedule;
pub mod verify;

pub use cost::WorkEstimate;
pub use plan::{plan_blocks, plan_for};
pub use schedule::{choose_block_size, BlockSizeHint};
pub use verify::{validate_plan, PlanError};
