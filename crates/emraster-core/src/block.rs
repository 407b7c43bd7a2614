//! Row-block descriptors shared by the scheduler, the stores and the driver.
//!
//! A plan partitions the rows of a grid into contiguous runs. Every stream that
//! takes part in one arithmetic call walks the same plan in the same order.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One contiguous run of rows (`start_row .. start_row + nrows`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBlock {
    pub start_row: usize,
    pub nrows: usize,
}

impl RowBlock {
    pub const fn new(start_row: usize, nrows: usize) -> Self {
        Self { start_row, nrows }
    }

    pub fn rows(&self) -> Range<usize> {
        self.start_row..self.start_row + self.nrows
    }

    pub fn end_row(&self) -> usize {
        self.start_row + self.nrows
    }

    /// Cells in this block for a grid of `ncol` columns and `nlyr` layers.
    pub fn ncells(&self, ncol: usize, nlyr: usize) -> usize {
        self.nrows * ncol * nlyr
    }
}

/// Ordered row-block partition (the planner fills this).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPlan {
    blocks: Vec<RowBlock>,
}

impl BlockPlan {
    pub fn new(blocks: Vec<RowBlock>) -> Self {
        Self { blocks }
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<RowBlock> {
        self.blocks.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = RowBlock> + '_ {
        self.blocks.iter().copied()
    }

    pub fn blocks(&self) -> &[RowBlock] {
        &self.blocks
    }

    /// Sum of rows over all blocks.
    pub fn total_rows(&self) -> usize {
        self.blocks.iter().map(|b| b.nrows).sum()
    }

    /// Rows in the largest block (sizes the per-block buffers).
    pub fn max_rows(&self) -> usize {
        self.blocks.iter().map(|b| b.nrows).max().unwrap_or(0)
    }
}
