//! LMDB implementation of AccountStore.
//!
//! Key format: `len(account_id) ++ account_id`. Journaled updates write the
//! account row, its audit entries and admin-log entries in one transaction.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use samaritan_store::{AccountStore, Journal, StoreError};
use samaritan_types::{Account, AccountId, AuditEntryId};

use crate::audit::{append_admin_in, append_audit_in};
use crate::keys::str_key;
use crate::LmdbError;

pub struct LmdbAccountStore {
    pub(crate) env: Arc<Env>,
    pub(crate) accounts_db: Database<Bytes, Bytes>,
    pub(crate) audit_db: Database<Bytes, Bytes>,
    pub(crate) audit_by_account_db: Database<Bytes, Bytes>,
    pub(crate) admin_db: Database<Bytes, Bytes>,
}

impl AccountStore for LmdbAccountStore {
    fn get_account(&self, id: &AccountId) -> Result<Account, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .accounts_db
            .get(&rtxn, &str_key(id.as_str())?)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("account {id}")))?;
        let account: Account = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(account)
    }

    fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        let bytes = bincode::serialize(account).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.accounts_db
            .put(&mut wtxn, &str_key(account.id.as_str())?, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn exists(&self, id: &AccountId) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self
            .accounts_db
            .get(&rtxn, &str_key(id.as_str())?)
            .map_err(LmdbError::from)?
            .is_some())
    }

    fn update_account_journaled(
        &self,
        id: &AccountId,
        f: &mut dyn FnMut(&mut Account) -> Option<Journal>,
    ) -> Result<(Account, Vec<AuditEntryId>), StoreError> {
        let key = str_key(id.as_str())?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current: Account = {
            let val = self
                .accounts_db
                .get(&wtxn, &key)
                .map_err(LmdbError::from)?
                .ok_or_else(|| LmdbError::NotFound(format!("account {id}")))?;
            bincode::deserialize(val).map_err(LmdbError::from)?
        };

        let mut edited = current.clone();
        let Some(journal) = f(&mut edited) else {
            // Dropping the transaction aborts it.
            return Ok((current, Vec::new()));
        };

        let bytes = bincode::serialize(&edited).map_err(LmdbError::from)?;
        self.accounts_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        let mut ids = Vec::with_capacity(journal.audit.len());
        for entry in &journal.audit {
            ids.push(append_audit_in(
                &mut wtxn,
                self.audit_db,
                self.audit_by_account_db,
                entry,
            )?);
        }
        for entry in &journal.admin {
            append_admin_in(&mut wtxn, self.admin_db, entry)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok((edited, ids))
    }
}
