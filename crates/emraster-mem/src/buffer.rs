//! Budget-accounted cell buffers for streamed blocks.
//!
//! A `CellBuf` reserves its capacity from the budget *before* allocating.
//! `as_mut_vec` hands out the raw vector for readers and recycling; callers
//! that may push past `accounted_cells()` must call `try_reserve_total` first.

use std::ops::{Deref, DerefMut};

use emraster_core::budget::{BudgetGuard, MemoryBudget};
use emraster_core::CELL_BYTES;

use crate::error::{Error, Result};
use crate::guard::BudgetGuardImpl;

#[derive(Debug)]
pub struct CellBuf {
    guard: BudgetGuardImpl,
    cells: Vec<f64>,
}

impl CellBuf {
    /// Empty buffer with room for `cap` cells, accounted against `budget`.
    pub fn with_capacity(
        budget: &impl MemoryBudget<Guard = BudgetGuardImpl>,
        cap: usize,
        tag: &'static str,
    ) -> Result<Self> {
        let bytes = cap
            .checked_mul(CELL_BYTES)
            .ok_or(Error::Overflow { tag, cells: cap })?;
        let guard = budget
            .try_acquire(bytes, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: bytes,
                capacity: budget.capacity_bytes(),
                used: budget.used_bytes(),
            })?;
        Ok(Self {
            guard,
            cells: Vec::with_capacity(cap),
        })
    }

    /// Make sure the buffer may hold `total` cells, reserving budget first.
    pub fn try_reserve_total(&mut self, total: usize) -> Result<()> {
        let tag = self.guard.tag();
        let bytes = total
            .checked_mul(CELL_BYTES)
            .ok_or(Error::Overflow { tag, cells: total })?;
        if bytes <= self.guard.bytes() {
            return Ok(());
        }
        let held = self.guard.bytes();
        if !self.guard.try_resize(bytes) {
            return Err(Error::GrowthRefused {
                tag,
                requested: bytes - held,
                held,
            });
        }
        self.cells
            .reserve_exact(total.saturating_sub(self.cells.len()));
        Ok(())
    }

    /// Cells this buffer may hold without further accounting.
    pub fn accounted_cells(&self) -> usize {
        self.guard.bytes() / CELL_BYTES
    }

    /// Mutable access to the backing vector, for readers that append.
    pub fn as_mut_vec(&mut self) -> &mut Vec<f64> {
        &mut self.cells
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

impl Deref for CellBuf {
    type Target = [f64];
    fn deref(&self) -> &Self::Target {
        &self.cells
    }
}

impl DerefMut for CellBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cells
    }
}
