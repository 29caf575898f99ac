//! Device binding policy.
//!
//! A fingerprint may be bound to several accounts (shared household devices
//! are legitimate), but at most one non-blocked binding of a fingerprint is
//! primary, and each account holds a bounded number of active bindings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use samaritan_types::{
    Account, AccountId, DeviceBinding, DeviceMeta, DeviceParams, Fingerprint, SessionRecord,
    Timestamp,
};

use crate::DeviceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Answer to "can this account use this device, and how risky is it?"
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingCheck {
    pub allowed: bool,
    /// The account has no binding for this fingerprint yet.
    pub is_new_device: bool,
    /// Other accounts holding this fingerprint.
    pub conflicting_accounts: Vec<AccountId>,
    /// Subset of `conflicting_accounts` that are banned or shadow-banned.
    pub sanctioned_accounts: Vec<AccountId>,
    pub risk_level: RiskLevel,
    pub warning: Option<String>,
}

/// Accounts linked to a caller through a shared device or a shared IP.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiAccountReport {
    pub count: usize,
    pub account_ids: Vec<AccountId>,
}

#[derive(Clone, Debug, Default)]
pub struct BindingPolicy {
    params: DeviceParams,
}

impl BindingPolicy {
    pub fn new(params: DeviceParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DeviceParams {
        &self.params
    }

    /// Assess `account_id` using `fingerprint`.
    ///
    /// - `fingerprint_bindings`: every binding of the fingerprint, any account.
    /// - `own_bindings`: every binding held by `account_id`.
    /// - `other_owners`: the accounts behind the foreign bindings.
    pub fn assess(
        &self,
        account_id: &AccountId,
        fingerprint_bindings: &[DeviceBinding],
        own_bindings: &[DeviceBinding],
        other_owners: &[Account],
    ) -> BindingCheck {
        let is_new_device = !fingerprint_bindings
            .iter()
            .any(|b| &b.account_id == account_id);

        let foreign: Vec<&DeviceBinding> = fingerprint_bindings
            .iter()
            .filter(|b| &b.account_id != account_id)
            .collect();

        // Blocked bindings still count here: a ban must not be escaped by
        // having the old binding blocked.
        let sanctioned_accounts: Vec<AccountId> = sorted_unique(
            foreign
                .iter()
                .filter(|b| {
                    other_owners
                        .iter()
                        .any(|a| a.id == b.account_id && a.is_sanctioned())
                })
                .map(|b| b.account_id.clone()),
        );

        let conflicting_accounts: Vec<AccountId> = sorted_unique(
            foreign
                .iter()
                .filter(|b| b.is_active() || sanctioned_accounts.contains(&b.account_id))
                .map(|b| b.account_id.clone()),
        );

        if !sanctioned_accounts.is_empty() {
            return BindingCheck {
                allowed: false,
                is_new_device,
                conflicting_accounts,
                sanctioned_accounts,
                risk_level: RiskLevel::Critical,
                warning: Some("device was previously used by a sanctioned account".to_string()),
            };
        }

        if !conflicting_accounts.is_empty() {
            let warning = format!(
                "device is also bound to {} other account(s)",
                conflicting_accounts.len()
            );
            return BindingCheck {
                allowed: true,
                is_new_device,
                conflicting_accounts,
                sanctioned_accounts,
                risk_level: RiskLevel::High,
                warning: Some(warning),
            };
        }

        let active_own = own_bindings.iter().filter(|b| b.is_active()).count() as u32;
        let (risk_level, warning) = if active_own >= self.params.multi_device_warning_at {
            (
                RiskLevel::Medium,
                Some(format!("account already uses {active_own} devices")),
            )
        } else {
            (RiskLevel::Low, None)
        };

        BindingCheck {
            allowed: true,
            is_new_device,
            conflicting_accounts,
            sanctioned_accounts,
            risk_level,
            warning,
        }
    }

    /// Compute the binding row to persist for `account_id` on `fingerprint`.
    ///
    /// Repeated registration refreshes `last_used_at`. A new binding is primary
    /// only if it is the account's first ever and no other active account holds
    /// the fingerprint as primary.
    pub fn plan_registration(
        &self,
        account_id: &AccountId,
        fingerprint: &Fingerprint,
        fingerprint_bindings: &[DeviceBinding],
        own_bindings: &[DeviceBinding],
        meta: DeviceMeta,
        now: Timestamp,
    ) -> Result<DeviceBinding, DeviceError> {
        if let Some(existing) = own_bindings.iter().find(|b| &b.fingerprint == fingerprint) {
            if existing.is_blocked {
                return Err(DeviceError::DeviceConflict(fingerprint.clone()));
            }
            let mut refreshed = existing.clone();
            refreshed.last_used_at = now.max(existing.last_used_at);
            if meta != DeviceMeta::default() {
                refreshed.meta = meta;
            }
            return Ok(refreshed);
        }

        let active_own = own_bindings.iter().filter(|b| b.is_active()).count() as u32;
        if active_own >= self.params.max_bindings_per_account {
            return Err(DeviceError::DeviceLimitReached {
                max: self.params.max_bindings_per_account,
            });
        }

        let foreign_primary = fingerprint_bindings
            .iter()
            .any(|b| &b.account_id != account_id && b.is_primary && b.is_active());

        Ok(DeviceBinding {
            fingerprint: fingerprint.clone(),
            account_id: account_id.clone(),
            is_primary: own_bindings.is_empty() && !foreign_primary,
            is_blocked: false,
            first_seen_at: now,
            last_used_at: now,
            meta,
        })
    }

    /// Union of accounts sharing the fingerprint with accounts that had a
    /// session from the same IP inside the look-back window, minus the caller.
    pub fn linked_accounts(
        &self,
        account_id: &AccountId,
        fingerprint_bindings: &[DeviceBinding],
        ip_sessions: &[SessionRecord],
        now: Timestamp,
    ) -> MultiAccountReport {
        let since = now.saturating_sub_secs(self.params.multi_account_window_days * 86_400);
        let account_ids = sorted_unique(
            fingerprint_bindings
                .iter()
                .map(|b| b.account_id.clone())
                .chain(
                    ip_sessions
                        .iter()
                        .filter(|s| s.created_at >= since)
                        .map(|s| s.account_id.clone()),
                )
                .filter(|id| id != account_id),
        );
        MultiAccountReport {
            count: account_ids.len(),
            account_ids,
        }
    }
}

fn sorted_unique(ids: impl Iterator<Item = AccountId>) -> Vec<AccountId> {
    ids.collect::<BTreeSet<_>>().into_iter().collect()
}
