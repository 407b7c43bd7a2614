//! Plan verification helpers.
//!
//! Cheap checks that a plan covers every row exactly once, in increasing
//! order, with no empty blocks.

use emraster_core::block::BlockPlan;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("block {index} is empty")]
    EmptyBlock { index: usize },

    #[error("block {index} starts at row {start}, expected {expected}")]
    Gap {
        index: usize,
        start: usize,
        expected: usize,
    },

    #[error("plan covers {covered} rows, grid has {nrow}")]
    Coverage { covered: usize, nrow: usize },
}

impl From<PlanError> for emraster_core::error::Error {
    fn from(e: PlanError) -> Self {
        emraster_core::error::Error::Invariant(e.to_string())
    }
}

/// Check that `plan` is an ordered exact partition of `0..nrow`.
pub fn validate_plan(plan: &BlockPlan, nrow: usize) -> Result<(), PlanError> {
    let mut expected = 0;
    for (index, block) in plan.iter().enumerate() {
        if block.nrows == 0 {
            return Err(PlanError::EmptyBlock { index });
        }
        if block.start_row != expected {
            return Err(PlanError::Gap {
                index,
                start: block.start_row,
                expected,
            });
        }
        expected = block.end_row();
    }
    if expected != nrow {
        return Err(PlanError::Coverage {
            covered: expected,
            nrow,
        });
    }
    Ok(())
}

/// Panicking variant for tests and debug assertions.
pub fn assert_plan(plan: &BlockPlan, nrow: usize) {
    if let Err(e) = validate_plan(plan, nrow) {
        panic!("invalid block plan: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emraster_core::block::RowBlock;

    #[test]
    fn detects_overlap() {
        let plan = BlockPlan::new(vec![RowBlock::new(0, 3), RowBlock::new(2, 3)]);
        assert_eq!(
            validate_plan(&plan, 5),
            Err(PlanError::Gap {
                index: 1,
                start: 2,
                expected: 3
            })
        );
    }

    #[test]
    fn detects_short_coverage() {
        let plan = BlockPlan::new(vec![RowBlock::new(0, 3)]);
        assert!(matches!(
            validate_plan(&plan, 4),
            Err(PlanError::Coverage { covered: 3, nrow: 4 })
        ));
    }

    #[test]
    fn detects_empty_block() {
        let plan = BlockPlan::new(vec![RowBlock::new(0, 0)]);
        assert_eq!(
            validate_plan(&plan, 0),
            Err(PlanError::EmptyBlock { index: 0 })
        );
    }

    #[test]
    #[should_panic(expected = "invalid block plan")]
    fn assert_panics() {
        assert_plan(&BlockPlan::default(), 1);
    }
}
