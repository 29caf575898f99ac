//! Rank allocation for helpers answering a help request.
//!
//! Any number of helpers may declare "I will help" concurrently. Each gets a
//! unique, dense rank in commit order; the first K unlock the requester's
//! contact details. Ranks are immutable once assigned.

pub mod arbiter;
pub mod error;

pub use arbiter::{RankArbiter, RankGrant};
pub use error::RankError;
