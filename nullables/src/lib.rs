//! Nullable infrastructure for deterministic testing.
//!
//! Test-friendly stand-ins for the engine's external dependencies:
//! - `NullStore` keeps every table in memory behind one lock
//! - `NullClock` only moves when told to
//! - `FlakyAuditSink` fails audit writes on demand
//!
//! Usage: swap real implementations for nullables in tests.

pub mod audit;
pub mod clock;
pub mod store;

pub use audit::FlakyAuditSink;
pub use clock::NullClock;
pub use store::NullStore;
