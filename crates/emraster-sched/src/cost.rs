//! Very lightweight cost model used to size row blocks.
//!
//! Work is counted in cells: every buffered stream holds `ncol * nlyr` cells per
//! row of the current block.

use emraster_core::CELL_BYTES;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkEstimate {
    /// Rows in the output grid.
    pub total_rows: u64,
    /// Columns in the output grid.
    pub ncol: u64,
    /// Layers held in memory per row, summed over all live block buffers.
    pub buffered_layers: u32,
}

impl WorkEstimate {
    /// Estimate for a grid where each entry of `stream_layers` is one live buffer.
    pub fn for_streams(nrow: usize, ncol: usize, stream_layers: &[usize]) -> Self {
        Self {
            total_rows: nrow as u64,
            ncol: ncol as u64,
            buffered_layers: stream_layers.iter().map(|&l| l as u32).sum(),
        }
    }

    /// Bytes one row costs across every buffer.
    pub fn bytes_per_row(&self) -> u64 {
        self.ncol
            .saturating_mul(self.buffered_layers as u64)
            .saturating_mul(CELL_BYTES as u64)
    }

    /// Bytes needed for the whole grid at once.
    pub fn total_bytes(&self) -> u64 {
        self.bytes_per_row().saturating_mul(self.total_rows)
    }

    /// Combine the estimates of two grids sharing the same row count.
    pub fn combine(a: Self, b: Self) -> Self {
        Self {
            total_rows: a.total_rows.max(b.total_rows),
            ncol: a.ncol.max(b.ncol),
            buffered_layers: a.buffered_layers + b.buffered_layers,
        }
    }
}
