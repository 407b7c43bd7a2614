//! Row-block partitioning.

use emraster_core::block::{BlockPlan, RowBlock};

use crate::cost::WorkEstimate;
use crate::schedule::choose_block_size;

/// Split `nrow` rows into consecutive blocks of `rows_per_block` rows; the last
/// block takes the remainder. Zero rows yields an empty plan.
pub fn plan_blocks(nrow: usize, rows_per_block: usize) -> BlockPlan {
    let step = rows_per_block.max(1);
    let blocks = (0..nrow)
        .step_by(step)
        .map(|start| RowBlock::new(start, step.min(nrow - start)))
        .collect();
    BlockPlan::new(blocks)
}

/// Plan a grid whose live buffers hold `stream_layers` layers each.
pub fn plan_for(
    nrow: usize,
    ncol: usize,
    stream_layers: &[usize],
    mem_cap_bytes: usize,
    rows_hint: Option<usize>,
) -> BlockPlan {
    let work = WorkEstimate::for_streams(nrow, ncol, stream_layers);
    let hint = choose_block_size(mem_cap_bytes, &work, rows_hint);
    plan_blocks(nrow, hint.rows_per_block as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::validate_plan;

    #[test]
    fn remainder_goes_to_last_block() {
        let plan = plan_blocks(10, 4);
        let blocks: Vec<_> = plan.iter().map(|b| (b.start_row, b.nrows)).collect();
        assert_eq!(blocks, vec![(0, 4), (4, 4), (8, 2)]);
        validate_plan(&plan, 10).unwrap();
    }

    #[test]
    fn single_block_when_rows_fit() {
        let plan = plan_blocks(3, 100);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.get(0).unwrap().nrows, 3);
    }

    #[test]
    fn zero_rows_is_empty() {
        assert!(plan_blocks(0, 8).is_empty());
    }

    #[test]
    fn plan_for_respects_cap() {
        // 4 cols, 1 + 1 layers = 64 bytes per row; 256 bytes => 4 rows.
        let plan = plan_for(9, 4, &[1, 1], 256, None);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.max_rows(), 4);
        validate_plan(&plan, 9).unwrap();
    }
}
