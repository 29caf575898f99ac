//! Nullable store — thread-safe in-memory storage for testing.
//!
//! Every table lives behind a single mutex, so each trait call is atomic with
//! respect to every other, matching the one-write-transaction behaviour of
//! the LMDB backend.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};

use samaritan_store::{
    AccountStore, AdminLogStore, AuditSink, DeviceStore, HelpRequestStore, Journal,
    RegistrationStore, SessionStore, StoreError,
};
use samaritan_types::{
    Account, AccountId, AdminActionEntry, AuditEntryId, DeviceBinding, Fingerprint, HelpRequest,
    HelperRegistration, RegistrationWithdrawal, RequestId, SecurityAuditEntry, SessionRecord,
    Timestamp,
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    bindings: BTreeMap<(Fingerprint, AccountId), DeviceBinding>,
    requests: HashMap<RequestId, HelpRequest>,
    registrations: HashMap<RequestId, Vec<HelperRegistration>>,
    withdrawals: HashMap<(RequestId, AccountId), RegistrationWithdrawal>,
    sessions: Vec<SessionRecord>,
    audit: Vec<SecurityAuditEntry>,
    admin: Vec<AdminActionEntry>,
}

impl Tables {
    fn append_audit(&mut self, entry: &SecurityAuditEntry) -> AuditEntryId {
        self.audit.push(entry.clone());
        AuditEntryId(self.audit.len() as u64)
    }

    fn fingerprint_bindings(&self, fingerprint: &Fingerprint) -> Vec<DeviceBinding> {
        self.bindings
            .values()
            .filter(|b| &b.fingerprint == fingerprint)
            .cloned()
            .collect()
    }

    fn account_bindings(&self, account_id: &AccountId) -> Vec<DeviceBinding> {
        self.bindings
            .values()
            .filter(|b| &b.account_id == account_id)
            .cloned()
            .collect()
    }
}

/// An in-memory implementation of every store trait.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("null store lock poisoned".into()))
    }

    /// Number of audit entries recorded so far.
    pub fn audit_len(&self) -> usize {
        self.tables().map(|t| t.audit.len()).unwrap_or(0)
    }

    /// Every audit entry, oldest first.
    pub fn all_audit_entries(&self) -> Vec<SecurityAuditEntry> {
        self.tables().map(|t| t.audit.clone()).unwrap_or_default()
    }
}

impl AccountStore for NullStore {
    fn get_account(&self, id: &AccountId) -> Result<Account, StoreError> {
        self.tables()?
            .accounts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))
    }

    fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        self.tables()?
            .accounts
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    fn exists(&self, id: &AccountId) -> Result<bool, StoreError> {
        Ok(self.tables()?.accounts.contains_key(id))
    }

    fn update_account_journaled(
        &self,
        id: &AccountId,
        f: &mut dyn FnMut(&mut Account) -> Option<Journal>,
    ) -> Result<(Account, Vec<AuditEntryId>), StoreError> {
        let mut tables = self.tables()?;
        let current = tables
            .accounts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))?;

        let mut edited = current.clone();
        let Some(journal) = f(&mut edited) else {
            return Ok((current, Vec::new()));
        };

        let ids: Vec<AuditEntryId> = journal
            .audit
            .iter()
            .map(|entry| tables.append_audit(entry))
            .collect();
        tables.admin.extend(journal.admin);
        tables.accounts.insert(id.clone(), edited.clone());
        Ok((edited, ids))
    }
}

impl DeviceStore for NullStore {
    fn get_binding(
        &self,
        fingerprint: &Fingerprint,
        account_id: &AccountId,
    ) -> Result<Option<DeviceBinding>, StoreError> {
        Ok(self
            .tables()?
            .bindings
            .get(&(fingerprint.clone(), account_id.clone()))
            .cloned())
    }

    fn bindings_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<DeviceBinding>, StoreError> {
        Ok(self.tables()?.fingerprint_bindings(fingerprint))
    }

    fn bindings_for_account(&self, account_id: &AccountId) -> Result<Vec<DeviceBinding>, StoreError> {
        Ok(self.tables()?.account_bindings(account_id))
    }

    fn put_binding(&self, binding: &DeviceBinding) -> Result<(), StoreError> {
        self.tables()?.bindings.insert(
            (binding.fingerprint.clone(), binding.account_id.clone()),
            binding.clone(),
        );
        Ok(())
    }

    fn upsert_binding_with(
        &self,
        fingerprint: &Fingerprint,
        account_id: &AccountId,
        plan: &mut dyn FnMut(&[DeviceBinding], &[DeviceBinding]) -> Option<DeviceBinding>,
    ) -> Result<Option<DeviceBinding>, StoreError> {
        let mut tables = self.tables()?;
        let by_fingerprint = tables.fingerprint_bindings(fingerprint);
        let by_account = tables.account_bindings(account_id);
        let Some(binding) = plan(&by_fingerprint, &by_account) else {
            return Ok(None);
        };
        tables.bindings.insert(
            (binding.fingerprint.clone(), binding.account_id.clone()),
            binding.clone(),
        );
        Ok(Some(binding))
    }

    fn block_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Vec<DeviceBinding>, StoreError> {
        let mut tables = self.tables()?;
        let blocked: Vec<DeviceBinding> = tables
            .bindings
            .values_mut()
            .filter(|b| &b.fingerprint == fingerprint)
            .map(|b| {
                b.is_blocked = true;
                b.clone()
            })
            .collect();
        Ok(blocked)
    }
}

impl HelpRequestStore for NullStore {
    fn get_request(&self, id: &RequestId) -> Result<HelpRequest, StoreError> {
        self.tables()?
            .requests
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("request {id}")))
    }

    fn put_request(&self, request: &HelpRequest) -> Result<(), StoreError> {
        self.tables()?
            .requests
            .insert(request.id.clone(), request.clone());
        Ok(())
    }
}

impl RegistrationStore for NullStore {
    fn register_next(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
        now: Timestamp,
    ) -> Result<(HelperRegistration, bool), StoreError> {
        let mut tables = self.tables()?;
        let rows = tables.registrations.entry(request_id.clone()).or_default();
        if let Some(existing) = rows.iter().find(|r| &r.helper_id == helper_id) {
            return Ok((existing.clone(), false));
        }
        let registration = HelperRegistration {
            request_id: request_id.clone(),
            helper_id: helper_id.clone(),
            rank: rows.len() as u32 + 1,
            registered_at: now,
        };
        rows.push(registration.clone());
        Ok((registration, true))
    }

    fn get_registration(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
    ) -> Result<Option<HelperRegistration>, StoreError> {
        Ok(self
            .tables()?
            .registrations
            .get(request_id)
            .and_then(|rows| rows.iter().find(|r| &r.helper_id == helper_id).cloned()))
    }

    fn registrations(&self, request_id: &RequestId) -> Result<Vec<HelperRegistration>, StoreError> {
        Ok(self
            .tables()?
            .registrations
            .get(request_id)
            .cloned()
            .unwrap_or_default())
    }

    fn put_withdrawal(&self, withdrawal: &RegistrationWithdrawal) -> Result<bool, StoreError> {
        let key = (withdrawal.request_id.clone(), withdrawal.helper_id.clone());
        let mut tables = self.tables()?;
        if tables.withdrawals.contains_key(&key) {
            return Ok(false);
        }
        tables.withdrawals.insert(key, withdrawal.clone());
        Ok(true)
    }

    fn get_withdrawal(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
    ) -> Result<Option<RegistrationWithdrawal>, StoreError> {
        Ok(self
            .tables()?
            .withdrawals
            .get(&(request_id.clone(), helper_id.clone()))
            .cloned())
    }
}

impl SessionStore for NullStore {
    fn record_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        self.tables()?.sessions.push(session.clone());
        Ok(())
    }

    fn sessions_for_ip(&self, ip: IpAddr, since: Timestamp) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .tables()?
            .sessions
            .iter()
            .filter(|s| s.ip == ip && s.created_at >= since)
            .cloned()
            .collect())
    }

    fn sessions_for_account(
        &self,
        account_id: &AccountId,
        since: Timestamp,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .tables()?
            .sessions
            .iter()
            .filter(|s| &s.account_id == account_id && s.created_at >= since)
            .cloned()
            .collect())
    }
}

impl AuditSink for NullStore {
    fn append(&self, entry: &SecurityAuditEntry) -> Result<AuditEntryId, StoreError> {
        Ok(self.tables()?.append_audit(entry))
    }

    fn entries_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<(AuditEntryId, SecurityAuditEntry)>, StoreError> {
        Ok(self
            .tables()?
            .audit
            .iter()
            .enumerate()
            .filter(|(_, e)| e.account_id.as_ref() == Some(account_id))
            .map(|(i, e)| (AuditEntryId(i as u64 + 1), e.clone()))
            .collect())
    }
}

impl AdminLogStore for NullStore {
    fn append_admin_action(&self, entry: &AdminActionEntry) -> Result<(), StoreError> {
        self.tables()?.admin.push(entry.clone());
        Ok(())
    }

    fn admin_actions_for(&self, target: &AccountId) -> Result<Vec<AdminActionEntry>, StoreError> {
        Ok(self
            .tables()?
            .admin
            .iter()
            .filter(|e| &e.target == target)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samaritan_store::UpdateDecision;
    use samaritan_types::{AdminAction, AuditEvent};

    fn id(s: &str) -> AccountId {
        AccountId::new(s)
    }

    #[test]
    fn discarded_update_leaves_row_alone() {
        let store = NullStore::new();
        store.put_account(&Account::new(id("a"), Timestamp::EPOCH)).unwrap();
        let after = store
            .update_account(&id("a"), &mut |a| {
                a.integrity_score = 0;
                UpdateDecision::Discard
            })
            .unwrap();
        assert_eq!(after.integrity_score, 50);
        assert_eq!(store.get_account(&id("a")).unwrap().integrity_score, 50);
    }

    #[test]
    fn journaled_update_writes_everything() {
        let store = NullStore::new();
        store.put_account(&Account::new(id("a"), Timestamp::EPOCH)).unwrap();
        let (account, ids) = store
            .update_account_journaled(&id("a"), &mut |a| {
                a.flags.is_shadow_banned = true;
                Some(Journal {
                    audit: vec![SecurityAuditEntry::new(
                        Some(id("a")),
                        AuditEvent::ManualShadowBan {
                            admin_id: id("root"),
                            reason: "spam".into(),
                        },
                        Timestamp::EPOCH,
                    )],
                    admin: vec![AdminActionEntry {
                        admin_id: id("root"),
                        target: id("a"),
                        action: AdminAction::ShadowBan,
                        reason: "spam".into(),
                        created_at: Timestamp::EPOCH,
                    }],
                })
            })
            .unwrap();
        assert!(account.flags.is_shadow_banned);
        assert_eq!(ids, vec![AuditEntryId(1)]);
        assert_eq!(store.entries_for_account(&id("a")).unwrap().len(), 1);
        assert_eq!(store.admin_actions_for(&id("a")).unwrap().len(), 1);
    }

    #[test]
    fn update_of_missing_account_is_not_found() {
        let store = NullStore::new();
        let err = store
            .update_account(&id("ghost"), &mut |_| UpdateDecision::Commit)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn register_next_is_dense_and_idempotent() {
        let store = NullStore::new();
        let req = RequestId::new("r");
        let (a, created_a) = store.register_next(&req, &id("a"), Timestamp::EPOCH).unwrap();
        let (b, _) = store.register_next(&req, &id("b"), Timestamp::EPOCH).unwrap();
        let (a2, created_a2) = store.register_next(&req, &id("a"), Timestamp::EPOCH).unwrap();
        assert_eq!((a.rank, b.rank, a2.rank), (1, 2, 1));
        assert!(created_a && !created_a2);
        assert_eq!(store.registrations(&req).unwrap().len(), 2);
    }
}
