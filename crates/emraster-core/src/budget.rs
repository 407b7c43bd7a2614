//! Abstract memory budget interfaces.
//!
//! The concrete implementation lives in `emraster-mem`. Only traits live here so
//! the io and exec crates can name the API without the accounting internals.

use crate::CELL_BYTES;

/// A guard returned by a memory budget when bytes are acquired.
///
/// Implementations must be RAII (release on Drop) and `Send`.
pub trait BudgetGuard: Send {
    /// Number of bytes currently accounted for by this guard.
    fn bytes(&self) -> usize;
    /// Debug tag for metrics/tracing.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A handle representing a memory-cap enforcer.
///
/// The driver calls `try_acquire_cells` before filling a block buffer. `None`
/// means the block does not fit and the call must fail with a budget error.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to acquire `bytes` from the live budget.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (bytes).
    fn capacity_bytes(&self) -> usize;

    /// Approximate currently used bytes (advisory).
    fn used_bytes(&self) -> usize;

    /// Acquire room for `cells` raster cells.
    fn try_acquire_cells(&self, cells: usize, tag: &'static str) -> Option<Self::Guard> {
        self.try_acquire(cells.checked_mul(CELL_BYTES)?, tag)
    }
}
