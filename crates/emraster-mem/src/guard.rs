//! MemoryBudget + RAII guard implementations.
//!
//! A guard holds bytes against the shared counter until it is dropped, so a
//! block buffer that goes out of scope on an error path still gives its bytes
//! back.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use emraster_core::budget::{BudgetGuard, MemoryBudget};
use emraster_core::CELL_BYTES;

struct Counter {
    capacity: usize,
    used: AtomicUsize,
}

impl Counter {
    /// Reserve `bytes` if the total stays within capacity.
    fn reserve(&self, bytes: usize) -> bool {
        let mut cur = self.used.load(Ordering::Relaxed);
        loop {
            let Some(next) = cur.checked_add(bytes) else {
                return false;
            };
            if next > self.capacity {
                return false;
            }
            match self
                .used
                .compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    fn give_back(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Shared byte budget. Cloning shares the same counter.
#[derive(Clone)]
pub struct MemoryBudgetImpl {
    counter: Arc<Counter>,
}

impl MemoryBudgetImpl {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            counter: Arc::new(Counter {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
            }),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.counter.used.load(Ordering::Relaxed)
    }

    pub fn capacity_bytes(&self) -> usize {
        self.counter.capacity
    }

    /// Bytes still available (advisory).
    pub fn headroom_bytes(&self) -> usize {
        self.capacity_bytes().saturating_sub(self.used_bytes())
    }

    /// Whether `cells` would fit in an otherwise empty budget.
    pub fn fits_cells(&self, cells: usize) -> bool {
        cells
            .checked_mul(CELL_BYTES)
            .map(|b| b <= self.capacity_bytes())
            .unwrap_or(false)
    }

    fn guard(&self, bytes: usize, tag: &'static str) -> BudgetGuardImpl {
        BudgetGuardImpl {
            counter: Arc::clone(&self.counter),
            bytes,
            tag,
        }
    }
}

impl fmt::Debug for MemoryBudgetImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBudgetImpl")
            .field("capacity", &self.capacity_bytes())
            .field("used", &self.used_bytes())
            .finish()
    }
}

/// RAII guard over a number of accounted bytes.
pub struct BudgetGuardImpl {
    counter: Arc<Counter>,
    bytes: usize,
    tag: &'static str,
}

impl BudgetGuardImpl {
    /// Grow or shrink the accounted bytes. Shrinking always succeeds; growing
    /// fails (leaving the guard unchanged) when the budget has no room.
    pub fn try_resize(&mut self, new_bytes: usize) -> bool {
        if new_bytes <= self.bytes {
            self.counter.give_back(self.bytes - new_bytes);
            self.bytes = new_bytes;
            return true;
        }
        if self.counter.reserve(new_bytes - self.bytes) {
            self.bytes = new_bytes;
            true
        } else {
            false
        }
    }
}

impl Drop for BudgetGuardImpl {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.counter.give_back(self.bytes);
            self.bytes = 0;
        }
    }
}

impl fmt::Debug for BudgetGuardImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BudgetGuardImpl")
            .field("tag", &self.tag)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl BudgetGuard for BudgetGuardImpl {
    fn bytes(&self) -> usize {
        self.bytes
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl MemoryBudget for MemoryBudgetImpl {
    type Guard = BudgetGuardImpl;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes == 0 || self.counter.reserve(bytes) {
            Some(self.guard(bytes, tag))
        } else {
            None
        }
    }

    fn capacity_bytes(&self) -> usize {
        self.counter.capacity
    }

    fn used_bytes(&self) -> usize {
        self.counter.used.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_respects_capacity() {
        let budget = MemoryBudgetImpl::new(100);
        let mut g = budget.try_acquire(40, "t").unwrap();
        assert!(g.try_resize(100));
        assert_eq!(budget.used_bytes(), 100);
        assert!(!g.try_resize(101));
        assert_eq!(g.bytes(), 100);
        assert!(g.try_resize(10));
        assert_eq!(budget.used_bytes(), 10);
        drop(g);
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn cells_are_eight_bytes() {
        let budget = MemoryBudgetImpl::new(80);
        assert!(budget.fits_cells(10));
        assert!(!budget.fits_cells(11));
        let g = budget.try_acquire_cells(10, "cells").unwrap();
        assert_eq!(g.bytes(), 80);
        assert!(budget.try_acquire_cells(1, "more").is_none());
        assert_eq!(budget.headroom_bytes(), 0);
    }

    #[test]
    fn zero_byte_guard_always_granted() {
        let budget = MemoryBudgetImpl::new(0);
        let g = budget.try_acquire(0, "empty").unwrap();
        assert_eq!(g.bytes(), 0);
    }
}
