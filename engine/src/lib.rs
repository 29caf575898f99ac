//! The trust & integrity engine.
//!
//! [`IntegrityEngine`] ties the pure decision crates (location, device, trust,
//! ranking) to storage. Each operation runs on the blocking pool under a
//! per-account or per-request lock, so concurrent calls for different keys
//! proceed in parallel while calls for the same key serialize.

pub mod audit_relay;
pub mod config;
pub mod engine;
pub mod error;
pub mod keyed_locks;
pub mod metrics;
pub mod stores;
pub mod tracing_spans;

pub use audit_relay::{AuditRelay, FlushReport};
pub use config::{EngineConfig, StorageBackend, StorageConfig};
pub use engine::IntegrityEngine;
pub use error::EngineError;
pub use keyed_locks::{KeyedLocks, LockKey};
pub use metrics::EngineMetrics;
pub use stores::EngineStores;
