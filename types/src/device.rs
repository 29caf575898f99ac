//! Device binding records.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Fingerprint, Timestamp};

/// Descriptive metadata captured when a device is first bound.
/// Not part of the fingerprint; stored for forensics only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    pub label: Option<String>,
    pub platform: Option<String>,
    pub user_agent: Option<String>,
}

/// Association between a device fingerprint and an account.
///
/// Keyed by `(fingerprint, account_id)`. Bindings are never deleted, only blocked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBinding {
    pub fingerprint: Fingerprint,
    pub account_id: AccountId,
    /// The account's primary device. At most one non-blocked account holds a
    /// given fingerprint as primary.
    pub is_primary: bool,
    pub is_blocked: bool,
    pub first_seen_at: Timestamp,
    pub last_used_at: Timestamp,
    #[serde(default)]
    pub meta: DeviceMeta,
}

impl DeviceBinding {
    pub fn is_active(&self) -> bool {
        !self.is_blocked
    }
}
