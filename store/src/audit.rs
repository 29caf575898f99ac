//! Security audit trail and admin action log.

use crate::StoreError;
use samaritan_types::{AccountId, AdminActionEntry, AuditEntryId, SecurityAuditEntry};

/// Append-only security audit trail.
pub trait AuditSink: Send + Sync {
    /// Append an entry and return its sequence number.
    fn append(&self, entry: &SecurityAuditEntry) -> Result<AuditEntryId, StoreError>;

    /// Entries about `account_id`, oldest first.
    fn entries_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<(AuditEntryId, SecurityAuditEntry)>, StoreError>;
}

/// Append-only log of administrative actions.
pub trait AdminLogStore: Send + Sync {
    fn append_admin_action(&self, entry: &AdminActionEntry) -> Result<(), StoreError>;

    /// Actions targeting `target`, oldest first.
    fn admin_actions_for(&self, target: &AccountId) -> Result<Vec<AdminActionEntry>, StoreError>;
}
