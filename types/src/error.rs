//! Errors raised while constructing core types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid fingerprint: {0:?}")]
    InvalidFingerprint(String),

    #[error("integrity score {0} is outside 0..=100")]
    ScoreOutOfRange(u32),
}
