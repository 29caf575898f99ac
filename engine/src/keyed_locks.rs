use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};

use samaritan_types::{AccountId, Fingerprint, RequestId};

use crate::EngineError;

/// What an engine operation serializes on.
///
/// Each kind is its own namespace: an account and a request with the same
/// raw id never share a lock.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LockKey {
    Account(AccountId),
    Request(RequestId),
    Device(Fingerprint),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account:{id}"),
            Self::Request(id) => write!(f, "request:{id}"),
            Self::Device(fp) => write!(f, "device:{fp}"),
        }
    }
}

/// Per-key lock for engine operations.
/// Operations on different keys run concurrently.
/// Operations on the same key are serialized.
pub struct KeyedLocks {
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
    max_concurrent: usize,
    /// Bounds operations in flight across all keys.
    permits: Arc<Semaphore>,
}

impl KeyedLocks {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            max_concurrent,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Get or create the lock for `key`.
    async fn lock_for(&self, key: &LockKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run the blocking closure `f` while holding the lock for `key`.
    ///
    /// `f` runs on tokio's blocking pool, so synchronous storage I/O never
    /// stalls the async workers. The permit and key guard travel with `f`:
    /// dropping the returned future does not release them before `f` ends.
    pub async fn run<F, R>(&self, key: &LockKey, f: F) -> Result<R, EngineError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::ShuttingDown)?;
        let key_guard = self.lock_for(key).await.lock_owned().await;

        tokio::task::spawn_blocking(move || {
            let _held = (permit, key_guard);
            f()
        })
        .await
        .map_err(|e| EngineError::Task(format!("{key}: {e}")))
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of keys that currently have a lock entry.
    pub async fn tracked_keys(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Drop lock entries nobody is holding or waiting on.
    ///
    /// Meant for the periodic sweep run by the surrounding scheduler.
    pub async fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    /// Stop admitting new operations. Calls already running finish.
    pub fn close(&self) {
        self.permits.close();
    }
}
