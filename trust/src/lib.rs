//! Trust scoring and shadow visibility.
//!
//! An account's trust is a continuous score in `0..=100`, a strike counter and
//! a set of flags. Marketplace events move them by fixed deltas; there is no
//! enumerated state diagram because independent events may land concurrently.
//! The engine applies each event inside one atomic read-modify-write.
//!
//! [`visibility::is_invisible`] derives whether other participants may see the
//! account. It is recomputed on every read and never cached.

pub mod error;
pub mod events;
pub mod visibility;

pub use error::TrustError;
pub use events::{apply_event, TrustEvent, TrustSnapshot, TrustTransition};
pub use visibility::{filter_visible, is_invisible};
