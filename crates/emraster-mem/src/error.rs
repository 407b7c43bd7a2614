use thiserror::Error;

/// Result type local to emraster-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory budget exceeded for tag '{tag}': requested {requested} bytes, capacity {capacity}, used {used}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("cannot grow buffer '{tag}' by {requested} bytes (holding {held})")]
    GrowthRefused {
        tag: &'static str,
        requested: usize,
        held: usize,
    },

    #[error("cell count overflow for tag '{tag}': {cells} cells")]
    Overflow { tag: &'static str, cells: usize },
}

impl From<Error> for emraster_core::error::Error {
    fn from(e: Error) -> Self {
        emraster_core::error::Error::Budget(e.to_string())
    }
}
