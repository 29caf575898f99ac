//! LMDB implementation of AuditSink and AdminLogStore.
//!
//! Audit entries are keyed by their big-endian sequence number; a secondary
//! index maps `len(account) ++ account ++ seq` to nothing. Admin actions are
//! keyed by `len(target) ++ target ++ seq`.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use samaritan_store::{AdminLogStore, AuditSink, StoreError};
use samaritan_types::{AccountId, AdminActionEntry, AuditEntryId, SecurityAuditEntry};

use crate::keys::{push_u64, read_u64, scan_prefix, str_key};
use crate::LmdbError;

pub struct LmdbAuditSink {
    pub(crate) env: Arc<Env>,
    pub(crate) audit_db: Database<Bytes, Bytes>,
    pub(crate) audit_by_account_db: Database<Bytes, Bytes>,
}

pub struct LmdbAdminLogStore {
    pub(crate) env: Arc<Env>,
    pub(crate) admin_db: Database<Bytes, Bytes>,
}

/// Append `entry` inside an open write transaction.
pub(crate) fn append_audit_in(
    wtxn: &mut RwTxn,
    audit_db: Database<Bytes, Bytes>,
    audit_by_account_db: Database<Bytes, Bytes>,
    entry: &SecurityAuditEntry,
) -> Result<AuditEntryId, LmdbError> {
    let next = match audit_db.last(wtxn)? {
        Some((key, _)) => read_u64(key)
            .ok_or_else(|| LmdbError::Corruption("audit key is not a sequence number".into()))?
            + 1,
        None => 1,
    };
    let bytes = bincode::serialize(entry)?;
    audit_db.put(wtxn, &next.to_be_bytes(), &bytes)?;
    if let Some(account_id) = &entry.account_id {
        let mut index_key = str_key(account_id.as_str())?;
        push_u64(&mut index_key, next);
        audit_by_account_db.put(wtxn, &index_key, &[])?;
    }
    Ok(AuditEntryId(next))
}

/// Append `entry` inside an open write transaction.
pub(crate) fn append_admin_in(
    wtxn: &mut RwTxn,
    admin_db: Database<Bytes, Bytes>,
    entry: &AdminActionEntry,
) -> Result<(), LmdbError> {
    let seq = admin_db.len(wtxn)? + 1;
    let mut key = str_key(entry.target.as_str())?;
    push_u64(&mut key, seq);
    let bytes = bincode::serialize(entry)?;
    admin_db.put(wtxn, &key, &bytes)?;
    Ok(())
}

impl AuditSink for LmdbAuditSink {
    fn append(&self, entry: &SecurityAuditEntry) -> Result<AuditEntryId, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let id = append_audit_in(&mut wtxn, self.audit_db, self.audit_by_account_db, entry)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(id)
    }

    fn entries_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<(AuditEntryId, SecurityAuditEntry)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = str_key(account_id.as_str())?;
        let mut entries = Vec::new();
        for (key, _) in scan_prefix(&self.audit_by_account_db, &rtxn, &prefix)? {
            let seq = read_u64(&key)
                .ok_or_else(|| LmdbError::Corruption("audit index key".into()))?;
            let val = self
                .audit_db
                .get(&rtxn, &seq.to_be_bytes())
                .map_err(LmdbError::from)?
                .ok_or_else(|| LmdbError::Corruption(format!("dangling audit index {seq}")))?;
            let entry: SecurityAuditEntry = bincode::deserialize(val).map_err(LmdbError::from)?;
            entries.push((AuditEntryId(seq), entry));
        }
        Ok(entries)
    }
}

impl AdminLogStore for LmdbAdminLogStore {
    fn append_admin_action(&self, entry: &AdminActionEntry) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        append_admin_in(&mut wtxn, self.admin_db, entry)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn admin_actions_for(&self, target: &AccountId) -> Result<Vec<AdminActionEntry>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = str_key(target.as_str())?;
        let mut actions = Vec::new();
        for (_, val) in scan_prefix(&self.admin_db, &rtxn, &prefix)? {
            actions.push(bincode::deserialize(&val).map_err(LmdbError::from)?);
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use samaritan_types::{AdminAction, AuditEvent, Timestamp};

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 0, 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    fn entry(account: Option<&str>) -> SecurityAuditEntry {
        SecurityAuditEntry::new(
            account.map(AccountId::new),
            AuditEvent::StrikeLimitShadowBan { strikes: 3 },
            Timestamp::from_secs(5),
        )
    }

    #[test]
    fn sequence_numbers_increase() {
        let (_dir, env) = temp_env();
        let sink = env.audit_sink();
        assert_eq!(sink.append(&entry(Some("a"))).unwrap(), AuditEntryId(1));
        assert_eq!(sink.append(&entry(None)).unwrap(), AuditEntryId(2));
        assert_eq!(sink.append(&entry(Some("b"))).unwrap(), AuditEntryId(3));
    }

    #[test]
    fn entries_are_indexed_by_account() {
        let (_dir, env) = temp_env();
        let sink = env.audit_sink();
        sink.append(&entry(Some("a"))).unwrap();
        sink.append(&entry(Some("ab"))).unwrap();
        sink.append(&entry(Some("a"))).unwrap();

        let found = sink.entries_for_account(&AccountId::new("a")).unwrap();
        let ids: Vec<u64> = found.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(found[0].1.event_type(), "STRIKE_LIMIT_SHADOW_BAN");
    }

    #[test]
    fn admin_actions_round_trip() {
        let (_dir, env) = temp_env();
        let log = env.admin_log_store();
        let action = AdminActionEntry {
            admin_id: AccountId::new("root"),
            target: AccountId::new("a"),
            action: AdminAction::ShadowBan,
            reason: "spam".into(),
            created_at: Timestamp::EPOCH,
        };
        log.append_admin_action(&action).unwrap();
        assert_eq!(log.admin_actions_for(&AccountId::new("a")).unwrap(), vec![action]);
        assert!(log.admin_actions_for(&AccountId::new("b")).unwrap().is_empty());
    }
}
