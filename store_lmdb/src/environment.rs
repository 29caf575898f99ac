//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::info;

use crate::{
    LmdbAccountStore, LmdbAdminLogStore, LmdbAuditSink, LmdbDeviceStore, LmdbError,
    LmdbHelpRequestStore, LmdbRegistrationStore, LmdbSessionStore,
};

/// Number of named databases opened below.
const DATABASE_COUNT: u32 = 12;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    accounts_db: Database<Bytes, Bytes>,
    bindings_db: Database<Bytes, Bytes>,
    account_bindings_db: Database<Bytes, Bytes>,
    requests_db: Database<Bytes, Bytes>,
    registrations_db: Database<Bytes, Bytes>,
    helper_ranks_db: Database<Bytes, Bytes>,
    withdrawals_db: Database<Bytes, Bytes>,
    sessions_by_ip_db: Database<Bytes, Bytes>,
    sessions_by_account_db: Database<Bytes, Bytes>,
    audit_db: Database<Bytes, Bytes>,
    audit_by_account_db: Database<Bytes, Bytes>,
    admin_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// `max_dbs` is raised to the number of databases this backend needs if
    /// smaller.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: callers hold at most one live environment per path in this
        // process and never modify the files outside LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(DATABASE_COUNT))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let accounts_db = env.create_database(&mut wtxn, Some("accounts"))?;
        let bindings_db = env.create_database(&mut wtxn, Some("device_bindings"))?;
        let account_bindings_db = env.create_database(&mut wtxn, Some("account_bindings"))?;
        let requests_db = env.create_database(&mut wtxn, Some("help_requests"))?;
        let registrations_db = env.create_database(&mut wtxn, Some("registrations"))?;
        let helper_ranks_db = env.create_database(&mut wtxn, Some("helper_ranks"))?;
        let withdrawals_db = env.create_database(&mut wtxn, Some("withdrawals"))?;
        let sessions_by_ip_db = env.create_database(&mut wtxn, Some("sessions_by_ip"))?;
        let sessions_by_account_db = env.create_database(&mut wtxn, Some("sessions_by_account"))?;
        let audit_db = env.create_database(&mut wtxn, Some("security_audit"))?;
        let audit_by_account_db = env.create_database(&mut wtxn, Some("security_audit_by_account"))?;
        let admin_db = env.create_database(&mut wtxn, Some("admin_actions"))?;
        wtxn.commit()?;

        info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            accounts_db,
            bindings_db,
            account_bindings_db,
            requests_db,
            registrations_db,
            helper_ranks_db,
            withdrawals_db,
            sessions_by_ip_db,
            sessions_by_account_db,
            audit_db,
            audit_by_account_db,
            admin_db,
        })
    }

    pub fn account_store(&self) -> LmdbAccountStore {
        LmdbAccountStore {
            env: self.env.clone(),
            accounts_db: self.accounts_db,
            audit_db: self.audit_db,
            audit_by_account_db: self.audit_by_account_db,
            admin_db: self.admin_db,
        }
    }

    pub fn device_store(&self) -> LmdbDeviceStore {
        LmdbDeviceStore {
            env: self.env.clone(),
            bindings_db: self.bindings_db,
            account_bindings_db: self.account_bindings_db,
        }
    }

    pub fn help_request_store(&self) -> LmdbHelpRequestStore {
        LmdbHelpRequestStore {
            env: self.env.clone(),
            requests_db: self.requests_db,
        }
    }

    pub fn registration_store(&self) -> LmdbRegistrationStore {
        LmdbRegistrationStore {
            env: self.env.clone(),
            registrations_db: self.registrations_db,
            helper_ranks_db: self.helper_ranks_db,
            withdrawals_db: self.withdrawals_db,
        }
    }

    pub fn session_store(&self) -> LmdbSessionStore {
        LmdbSessionStore {
            env: self.env.clone(),
            sessions_by_ip_db: self.sessions_by_ip_db,
            sessions_by_account_db: self.sessions_by_account_db,
        }
    }

    pub fn audit_sink(&self) -> LmdbAuditSink {
        LmdbAuditSink {
            env: self.env.clone(),
            audit_db: self.audit_db,
            audit_by_account_db: self.audit_by_account_db,
        }
    }

    pub fn admin_log_store(&self) -> LmdbAdminLogStore {
        LmdbAdminLogStore {
            env: self.env.clone(),
            admin_db: self.admin_db,
        }
    }

    /// Flush the memory map to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopen_keeps_data() {
        use samaritan_store::AccountStore;
        use samaritan_types::{Account, AccountId, Timestamp};

        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 0, 1 << 20).unwrap();
            env.account_store()
                .put_account(&Account::new(AccountId::new("a"), Timestamp::EPOCH))
                .unwrap();
            env.sync().unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 0, 1 << 20).unwrap();
        assert!(env.account_store().exists(&AccountId::new("a")).unwrap());
    }
}
