//! The set of store handles an engine runs on.

use std::sync::Arc;

use samaritan_nullables::NullStore;
use samaritan_store::{
    AccountStore, AdminLogStore, AuditSink, DeviceStore, HelpRequestStore, RegistrationStore,
    SessionStore,
};
use samaritan_store_lmdb::LmdbEnvironment;

use crate::{EngineError, StorageBackend, StorageConfig};

/// Every store the engine reads or writes, as trait objects.
#[derive(Clone)]
pub struct EngineStores {
    pub accounts: Arc<dyn AccountStore>,
    pub devices: Arc<dyn DeviceStore>,
    pub requests: Arc<dyn HelpRequestStore>,
    pub registrations: Arc<dyn RegistrationStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub audit: Arc<dyn AuditSink>,
    pub admin_log: Arc<dyn AdminLogStore>,
}

impl EngineStores {
    /// All stores backed by one in-memory [`NullStore`].
    pub fn from_null_store(store: Arc<NullStore>) -> Self {
        Self {
            accounts: store.clone(),
            devices: store.clone(),
            requests: store.clone(),
            registrations: store.clone(),
            sessions: store.clone(),
            audit: store.clone(),
            admin_log: store,
        }
    }

    /// All stores backed by one LMDB environment.
    pub fn from_lmdb(env: &LmdbEnvironment) -> Self {
        Self {
            accounts: Arc::new(env.account_store()),
            devices: Arc::new(env.device_store()),
            requests: Arc::new(env.help_request_store()),
            registrations: Arc::new(env.registration_store()),
            sessions: Arc::new(env.session_store()),
            audit: Arc::new(env.audit_sink()),
            admin_log: Arc::new(env.admin_log_store()),
        }
    }

    /// Open the backend selected in `config`.
    pub fn open(config: &StorageConfig) -> Result<Self, EngineError> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::from_null_store(Arc::new(NullStore::new()))),
            StorageBackend::Lmdb => {
                let env = LmdbEnvironment::open(&config.data_dir, 0, config.map_size)?;
                Ok(Self::from_lmdb(&env))
            }
        }
    }

    /// Replace the audit sink, keeping every other store.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }
}
