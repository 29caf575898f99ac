//! Nullable audit sink — fails on demand.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use samaritan_store::{AuditSink, StoreError};
use samaritan_types::{AccountId, AuditEntryId, SecurityAuditEntry};

/// Audit sink that forwards to an inner sink unless switched to failing.
pub struct FlakyAuditSink {
    inner: Arc<dyn AuditSink>,
    failing: AtomicBool,
    rejected: AtomicU64,
}

impl FlakyAuditSink {
    pub fn new(inner: Arc<dyn AuditSink>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            rejected: AtomicU64::new(0),
        }
    }

    /// Make every following `append` fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How many appends have been refused.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl AuditSink for FlakyAuditSink {
    fn append(&self, entry: &SecurityAuditEntry) -> Result<AuditEntryId, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Backend("audit sink unavailable".into()));
        }
        self.inner.append(entry)
    }

    fn entries_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<(AuditEntryId, SecurityAuditEntry)>, StoreError> {
        self.inner.entries_for_account(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullStore;
    use samaritan_types::{AuditEvent, Timestamp};

    #[test]
    fn fails_only_while_switched_on() {
        let store = Arc::new(NullStore::new());
        let sink = FlakyAuditSink::new(store.clone());
        let entry = SecurityAuditEntry::new(
            Some(AccountId::new("a")),
            AuditEvent::StrikeLimitShadowBan { strikes: 3 },
            Timestamp::EPOCH,
        );

        sink.set_failing(true);
        assert!(sink.append(&entry).is_err());
        assert_eq!(sink.rejected(), 1);
        assert_eq!(store.audit_len(), 0);

        sink.set_failing(false);
        assert_eq!(sink.append(&entry).unwrap(), AuditEntryId(1));
        assert_eq!(store.audit_len(), 1);
    }
}
