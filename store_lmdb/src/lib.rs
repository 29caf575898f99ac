//! LMDB storage backend for the integrity engine.
//!
//! Implements all storage traits from `samaritan-store` using the `heed` LMDB
//! bindings. Each logical store maps to one or more LMDB databases within a
//! single environment. Atomic trait operations run inside one write
//! transaction; LMDB admits a single writer at a time, so they serialize.

pub mod account;
pub mod audit;
pub mod device;
pub mod environment;
pub mod error;
mod keys;
pub mod registration;
pub mod request;
pub mod session;

pub use account::LmdbAccountStore;
pub use audit::{LmdbAdminLogStore, LmdbAuditSink};
pub use device::LmdbDeviceStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use registration::LmdbRegistrationStore;
pub use request::LmdbHelpRequestStore;
pub use session::LmdbSessionStore;
