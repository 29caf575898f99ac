//! Fundamental types for the Samaritan trust & integrity engine.
//!
//! This crate defines the records shared across every other crate in the workspace:
//! identifiers, timestamps, accounts, device bindings, help requests, helper
//! registrations, the typed security audit trail, and the tunable policy parameters.

pub mod account;
pub mod audit;
pub mod device;
pub mod error;
pub mod ids;
pub mod params;
pub mod request;
pub mod time;

pub use account::{Account, AccountFlags, IpHistory, IpObservation, LastKnownLocation};
pub use audit::{
    AdminAction, AdminActionEntry, AuditEntryId, AuditEvent, AuditReceipt, SecurityAuditEntry,
    Severity,
};
pub use device::{DeviceBinding, DeviceMeta};
pub use error::TypesError;
pub use ids::{AccountId, Fingerprint, RequestId};
pub use params::{DeviceParams, IntegrityParams, LocationParams, RankingParams, TrustParams};
pub use request::{
    HelpRequest, HelperRegistration, RegistrationWithdrawal, RequestStatus, SessionRecord,
};
pub use time::Timestamp;
