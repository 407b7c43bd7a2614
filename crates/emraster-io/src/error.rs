use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("header: {0}")]
    Header(String),

    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("store is not open for {0}")]
    NotOpen(&'static str),

    #[error("store is already open for writing")]
    AlreadyWriting,

    #[error("destination exists: {0}")]
    Exists(String),

    #[error("raster has no values")]
    NoValues,

    #[error("store lock poisoned")]
    Poisoned,

    #[error("{0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Header(e.to_string())
    }
}
