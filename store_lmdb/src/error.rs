use samaritan_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupted record: {0}")]
    Corruption(String),

    /// A key component longer than its `u16` length prefix can describe.
    #[error("key component of {0} bytes is too long")]
    KeyTooLong(usize),
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::NotFound(what) => StoreError::NotFound(what),
            LmdbError::Serialization(err) => StoreError::Serialization(err.to_string()),
            LmdbError::Corruption(what) => StoreError::Corruption(what),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
