use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    #[error("rating must be between 1 and 5 stars, got {0}")]
    InvalidRating(u8),
}
