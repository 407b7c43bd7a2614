use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("unknown arith function '{0}'")]
    Unsupported(String),

    #[error("operand shape: {0}")]
    Shape(String),
}

impl From<OpError> for emraster_core::error::Error {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Unsupported(sym) => emraster_core::error::Error::UnsupportedOperator(sym),
            OpError::Shape(msg) => emraster_core::error::Error::Invariant(msg),
        }
    }
}
