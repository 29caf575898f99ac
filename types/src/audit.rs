//! Security audit trail and administrative action log.
//!
//! Every audit event kind is its own variant carrying exactly the evidence
//! that kind needs. Entries are write-once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::{AccountId, Fingerprint, Timestamp};

/// Sequence number assigned by the audit sink on append.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub u64);

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audit#{}", self.0)
    }
}

/// Outcome of handing an entry to the audit sink.
///
/// A failed write never rolls back the change it accompanies; the entry is
/// queued for retry and the receipt says so.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditReceipt {
    Recorded(AuditEntryId),
    Deferred,
}

impl AuditReceipt {
    pub fn entry_id(&self) -> Option<AuditEntryId> {
        match self {
            Self::Recorded(id) => Some(*id),
            Self::Deferred => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened, with the evidence specific to that kind of event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AuditEvent {
    /// Client reported a ground speed above the physical ceiling.
    ImpossibleSpeed { reported_kmh: f64, ceiling_kmh: f64 },
    /// Large displacement between two fixes less than a second apart.
    TeleportDetected { distance_km: f64, elapsed_ms: u64 },
    /// Implied travel speed between consecutive fixes exceeds the ceiling.
    ImpossibleTravel {
        speed_kmh: f64,
        distance_km: f64,
        elapsed_ms: u64,
    },
    /// Fix stamped further in the future than clock skew explains.
    FutureTimestamp { ahead_ms: u64 },
    /// The device is already bound to one or more other accounts.
    MultiAccountDetected { conflicting: Vec<AccountId> },
    /// A device previously used by a banned identity tried to bind again.
    BannedDeviceReuse { banned_accounts: Vec<AccountId> },
    /// Third strike: account silently shadow-banned.
    StrikeLimitShadowBan { strikes: u32 },
    /// Administrator shadow-banned the account.
    ManualShadowBan { admin_id: AccountId, reason: String },
    /// Too many IP changes inside the observation window.
    ExcessiveIpChanges { changes: u32, window_secs: u64 },
    /// Too many distinct accounts seen behind one IP.
    SharedIpAddress { accounts: Vec<AccountId> },
    /// Administrator blocked every binding of a device.
    DeviceBlocked { admin_id: AccountId, bindings: u32 },
}

impl AuditEvent {
    /// Canonical event type name used by forensics tooling.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ImpossibleSpeed { .. } => "IMPOSSIBLE_SPEED",
            Self::TeleportDetected { .. } => "TELEPORT_DETECTED",
            Self::ImpossibleTravel { .. } => "IMPOSSIBLE_TRAVEL",
            Self::FutureTimestamp { .. } => "FUTURE_TIMESTAMP",
            Self::MultiAccountDetected { .. } => "MULTI_ACCOUNT_DETECTED",
            Self::BannedDeviceReuse { .. } => "BANNED_DEVICE_REUSE",
            Self::StrikeLimitShadowBan { .. } => "STRIKE_LIMIT_SHADOW_BAN",
            Self::ManualShadowBan { .. } => "MANUAL_SHADOW_BAN",
            Self::ExcessiveIpChanges { .. } => "EXCESSIVE_IP_CHANGES",
            Self::SharedIpAddress { .. } => "SHARED_IP_ADDRESS",
            Self::DeviceBlocked { .. } => "DEVICE_BLOCKED",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ImpossibleSpeed { .. }
            | Self::TeleportDetected { .. }
            | Self::ImpossibleTravel { .. }
            | Self::FutureTimestamp { .. }
            | Self::MultiAccountDetected { .. }
            | Self::ManualShadowBan { .. }
            | Self::DeviceBlocked { .. } => Severity::High,
            Self::BannedDeviceReuse { .. } => Severity::Critical,
            Self::StrikeLimitShadowBan { .. } => Severity::Medium,
            Self::ExcessiveIpChanges { .. } | Self::SharedIpAddress { .. } => Severity::Medium,
        }
    }

    /// Human-readable summary for the forensics log. Never shown to the actor.
    pub fn describe(&self) -> String {
        match self {
            Self::ImpossibleSpeed {
                reported_kmh,
                ceiling_kmh,
            } => format!("reported speed {reported_kmh:.1} km/h exceeds ceiling {ceiling_kmh:.1} km/h"),
            Self::TeleportDetected {
                distance_km,
                elapsed_ms,
            } => format!("moved {distance_km:.3} km in {elapsed_ms} ms"),
            Self::ImpossibleTravel {
                speed_kmh,
                distance_km,
                elapsed_ms,
            } => format!(
                "implied speed {speed_kmh:.1} km/h ({distance_km:.3} km in {elapsed_ms} ms)"
            ),
            Self::FutureTimestamp { ahead_ms } => {
                format!("fix stamped {ahead_ms} ms ahead of server time")
            }
            Self::MultiAccountDetected { conflicting } => {
                format!("device shared with accounts: {}", join_ids(conflicting))
            }
            Self::BannedDeviceReuse { banned_accounts } => format!(
                "device previously used by sanctioned accounts: {}",
                join_ids(banned_accounts)
            ),
            Self::StrikeLimitShadowBan { strikes } => {
                format!("shadow-banned after {strikes} strikes")
            }
            Self::ManualShadowBan { admin_id, reason } => {
                format!("shadow-banned by {admin_id}: {reason}")
            }
            Self::ExcessiveIpChanges {
                changes,
                window_secs,
            } => format!("{changes} IP changes within {window_secs}s"),
            Self::SharedIpAddress { accounts } => {
                format!("IP shared by accounts: {}", join_ids(accounts))
            }
            Self::DeviceBlocked { admin_id, bindings } => {
                format!("{bindings} binding(s) blocked by {admin_id}")
            }
        }
    }
}

fn join_ids(ids: &[AccountId]) -> String {
    ids.iter()
        .map(AccountId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append-only forensic record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityAuditEntry {
    pub account_id: Option<AccountId>,
    pub event: AuditEvent,
    pub severity: Severity,
    pub description: String,
    pub fingerprint: Option<Fingerprint>,
    pub ip: Option<IpAddr>,
    pub created_at: Timestamp,
}

impl SecurityAuditEntry {
    /// Build an entry with the event's default severity and description.
    pub fn new(account_id: Option<AccountId>, event: AuditEvent, created_at: Timestamp) -> Self {
        Self {
            account_id,
            severity: event.default_severity(),
            description: event.describe(),
            event,
            fingerprint: None,
            ip: None,
            created_at,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminAction {
    ShadowBan,
    BlockDevice,
}

/// Administrative action log, written atomically with the change it records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminActionEntry {
    pub admin_id: AccountId,
    pub target: AccountId,
    pub action: AdminAction,
    pub reason: String,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_inherits_event_severity() {
        let entry = SecurityAuditEntry::new(
            Some(AccountId::new("a")),
            AuditEvent::ImpossibleTravel {
                speed_kmh: 900.0,
                distance_km: 250.0,
                elapsed_ms: 1_000_000,
            },
            Timestamp::EPOCH,
        );
        assert_eq!(entry.severity, Severity::High);
        assert_eq!(entry.event_type(), "IMPOSSIBLE_TRAVEL");
        assert!(entry.description.contains("900.0 km/h"));
    }

    #[test]
    fn banned_device_reuse_is_critical() {
        let ev = AuditEvent::BannedDeviceReuse {
            banned_accounts: vec![AccountId::new("x")],
        };
        assert_eq!(ev.default_severity(), Severity::Critical);
        assert_eq!(ev.describe(), "device previously used by sanctioned accounts: x");
    }

    #[test]
    fn severity_orders_by_gravity() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }
}
