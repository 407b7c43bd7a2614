use thiserror::Error;

/// Canonical result for core and the arithmetic driver.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds a raster result can carry.
///
/// These are values, not panics: the engine records them on the output raster
/// and callers check `Raster::error()` before using the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unknown arith function '{0}'")]
    UnsupportedOperator(String),

    #[error("dimensions and/or extent do not match")]
    GeometryMismatch,

    #[error("raster has no values")]
    NoValues,

    #[error("operand has no elements")]
    EmptyOperand,

    #[error("cannot read from stream: {0}")]
    StreamRead(String),

    #[error("cannot write to stream: {0}")]
    StreamWrite(String),

    #[error("memory budget: {0}")]
    Budget(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl Error {
    /// Validation errors are raised before any stream is opened.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedOperator(_)
                | Error::GeometryMismatch
                | Error::NoValues
                | Error::EmptyOperand
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
