//! Block-size selection logic.
//!
//! Inputs:
//! - Memory cap (bytes).
//! - `WorkEstimate` (rows, columns, buffered layers).
//! - An optional explicit rows-per-block override.
//!
//! Output: how many rows each block holds.

use crate::cost::WorkEstimate;
use serde::{Deserialize, Serialize};

/// Rows per block used when building a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSizeHint {
    pub rows_per_block: u64,
}

pub fn choose_block_size(
    mem_cap_bytes: usize,
    work: &WorkEstimate,
    rows_hint: Option<usize>,
) -> BlockSizeHint {
    let max_rows = work.total_rows.max(1);

    if let Some(rows) = rows_hint {
        return BlockSizeHint {
            rows_per_block: (rows as u64).clamp(1, max_rows),
        };
    }

    let bytes_per_row = work.bytes_per_row();
    let rows = if bytes_per_row > 0 {
        // Largest block whose live buffers fit the cap.
        (mem_cap_bytes as u64 / bytes_per_row).clamp(1, max_rows)
    } else {
        // No column/layer information: sqrt(rows) as a coarse fallback.
        (f64::sqrt(work.total_rows as f64).max(1.0) as u64).min(max_rows)
    };

    BlockSizeHint {
        rows_per_block: rows.max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_the_cap() {
        // 10 cols * 2 layers * 8 bytes = 160 bytes per row.
        let w = WorkEstimate::for_streams(1000, 10, &[2]);
        let hint = choose_block_size(1600, &w, None);
        assert_eq!(hint.rows_per_block, 10);
        assert!(hint.rows_per_block * w.bytes_per_row() <= 1600);
    }

    #[test]
    fn whole_grid_when_cap_is_large() {
        let w = WorkEstimate::for_streams(7, 3, &[1]);
        assert_eq!(choose_block_size(1 << 30, &w, None).rows_per_block, 7);
    }

    #[test]
    fn at_least_one_row() {
        let w = WorkEstimate::for_streams(50, 1000, &[4]);
        assert_eq!(choose_block_size(1, &w, None).rows_per_block, 1);
    }

    #[test]
    fn explicit_hint_wins_but_is_clamped() {
        let w = WorkEstimate::for_streams(20, 10, &[1]);
        assert_eq!(choose_block_size(8, &w, Some(4)).rows_per_block, 4);
        assert_eq!(choose_block_size(8, &w, Some(500)).rows_per_block, 20);
    }

    #[test]
    fn sqrt_fallback_without_columns() {
        let w = WorkEstimate::for_streams(100, 0, &[1]);
        assert_eq!(choose_block_size(1024, &w, None).rows_per_block, 10);
    }
}
