//! LMDB implementation of SessionStore.
//!
//! Two indexes over the same records:
//! - by IP: `len(ip) ++ ip ++ created_at (u64 BE) ++ len(account) ++ account`
//! - by account: `len(account) ++ account ++ created_at (u64 BE) ++ len(ip) ++ ip`
//!
//! The timestamp follows the prefix, so "since" queries are a range scan.

use std::net::IpAddr;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use samaritan_store::{SessionStore, StoreError};
use samaritan_types::{AccountId, SessionRecord, Timestamp};

use crate::keys::{push_str, push_u64, scan_from, str_key};
use crate::LmdbError;

pub struct LmdbSessionStore {
    pub(crate) env: Arc<Env>,
    pub(crate) sessions_by_ip_db: Database<Bytes, Bytes>,
    pub(crate) sessions_by_account_db: Database<Bytes, Bytes>,
}

impl LmdbSessionStore {
    fn scan_since(
        &self,
        db: &Database<Bytes, Bytes>,
        prefix: Vec<u8>,
        since: Timestamp,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        let mut lower = prefix.clone();
        push_u64(&mut lower, since.as_millis());
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut sessions = Vec::new();
        for (_, val) in scan_from(db, &rtxn, &prefix, &lower)? {
            sessions.push(bincode::deserialize(&val).map_err(LmdbError::from)?);
        }
        Ok(sessions)
    }
}

impl SessionStore for LmdbSessionStore {
    fn record_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        let ip = session.ip.to_string();
        let account = session.account_id.as_str();
        let at = session.created_at.as_millis();

        let mut ip_key = str_key(&ip)?;
        push_u64(&mut ip_key, at);
        push_str(&mut ip_key, account)?;

        let mut account_key = str_key(account)?;
        push_u64(&mut account_key, at);
        push_str(&mut account_key, &ip)?;

        let bytes = bincode::serialize(session).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.sessions_by_ip_db
            .put(&mut wtxn, &ip_key, &bytes)
            .map_err(LmdbError::from)?;
        self.sessions_by_account_db
            .put(&mut wtxn, &account_key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn sessions_for_ip(&self, ip: IpAddr, since: Timestamp) -> Result<Vec<SessionRecord>, StoreError> {
        self.scan_since(&self.sessions_by_ip_db, str_key(&ip.to_string())?, since)
    }

    fn sessions_for_account(
        &self,
        account_id: &AccountId,
        since: Timestamp,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        self.scan_since(&self.sessions_by_account_db, str_key(account_id.as_str())?, since)
    }
}
