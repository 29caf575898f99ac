use thiserror::Error;

/// Failure of a storage collaborator.
///
/// Domain outcomes never travel through this type; everything here is
/// either a missing record or a problem with the backend itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record under the given key, e.g. `"account alice"`.
    #[error("no such record: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("record encoding failed: {0}")]
    Serialization(String),

    /// A stored record or index contradicts another one.
    #[error("inconsistent store state: {0}")]
    Corruption(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
