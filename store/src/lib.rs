//! Abstract storage traits for the integrity engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Every read-modify-write the engine needs is a single trait call, which the
//! backend executes atomically (one write transaction, or one lock).

pub mod account;
pub mod audit;
pub mod device;
pub mod error;
pub mod registration;
pub mod request;
pub mod session;

pub use account::{AccountStore, Journal, UpdateDecision};
pub use audit::{AdminLogStore, AuditSink};
pub use device::DeviceStore;
pub use error::StoreError;
pub use registration::RegistrationStore;
pub use request::HelpRequestStore;
pub use session::SessionStore;
