//! Device identity and binding.
//!
//! - [`fingerprint`]: derive a stable [`Fingerprint`](samaritan_types::Fingerprint)
//!   from client-reported attributes (pure hashing).
//! - [`binding`]: decide whether an account may use a device, and at what risk.
//! - [`ip_monitor`]: track login IPs and raise multi-account / churn warnings.
//!
//! Nothing here touches storage; the engine feeds in the records it loaded and
//! persists what the policy returns.

pub mod binding;
pub mod error;
pub mod fingerprint;
pub mod ip_monitor;

pub use binding::{BindingCheck, BindingPolicy, MultiAccountReport, RiskLevel};
pub use error::DeviceError;
pub use fingerprint::{compute_fingerprint, DeviceAttributes};
pub use ip_monitor::{IpActivityMonitor, IpWarning};
