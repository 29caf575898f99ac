//! LMDB implementation of RegistrationStore.
//!
//! Key formats:
//! - registrations: `len(request) ++ request ++ rank (u32 BE)`, so a prefix
//!   scan yields rank order
//! - helper ranks: `len(request) ++ request ++ len(helper) ++ helper` → rank
//! - withdrawals: same key as helper ranks

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use samaritan_store::{RegistrationStore, StoreError};
use samaritan_types::{AccountId, HelperRegistration, RegistrationWithdrawal, RequestId, Timestamp};

use crate::keys::{pair_key, scan_prefix, str_key};
use crate::LmdbError;

pub struct LmdbRegistrationStore {
    pub(crate) env: Arc<Env>,
    pub(crate) registrations_db: Database<Bytes, Bytes>,
    pub(crate) helper_ranks_db: Database<Bytes, Bytes>,
    pub(crate) withdrawals_db: Database<Bytes, Bytes>,
}

fn registration_key(request_id: &RequestId, rank: u32) -> Result<Vec<u8>, LmdbError> {
    let mut key = str_key(request_id.as_str())?;
    key.extend_from_slice(&rank.to_be_bytes());
    Ok(key)
}

impl LmdbRegistrationStore {
    fn find(
        &self,
        txn: &RoTxn,
        request_id: &RequestId,
        helper_id: &AccountId,
    ) -> Result<Option<HelperRegistration>, LmdbError> {
        let Some(rank_bytes) = self
            .helper_ranks_db
            .get(txn, &pair_key(request_id.as_str(), helper_id.as_str())?)?
        else {
            return Ok(None);
        };
        let rank = u32::from_be_bytes(
            rank_bytes
                .try_into()
                .map_err(|_| LmdbError::Corruption("helper rank is not a u32".into()))?,
        );
        let val = self
            .registrations_db
            .get(txn, &registration_key(request_id, rank)?)?
            .ok_or_else(|| LmdbError::Corruption(format!("rank {rank} of {request_id} missing")))?;
        Ok(Some(bincode::deserialize(val)?))
    }
}

impl RegistrationStore for LmdbRegistrationStore {
    fn register_next(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
        now: Timestamp,
    ) -> Result<(HelperRegistration, bool), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if let Some(existing) = self.find(&wtxn, request_id, helper_id)? {
            return Ok((existing, false));
        }

        let count = scan_prefix(&self.registrations_db, &wtxn, &str_key(request_id.as_str())?)?.len();
        let registration = HelperRegistration {
            request_id: request_id.clone(),
            helper_id: helper_id.clone(),
            rank: count as u32 + 1,
            registered_at: now,
        };
        let bytes = bincode::serialize(&registration).map_err(LmdbError::from)?;
        self.registrations_db
            .put(&mut wtxn, &registration_key(request_id, registration.rank)?, &bytes)
            .map_err(LmdbError::from)?;
        self.helper_ranks_db
            .put(
                &mut wtxn,
                &pair_key(request_id.as_str(), helper_id.as_str())?,
                &registration.rank.to_be_bytes(),
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok((registration, true))
    }

    fn get_registration(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
    ) -> Result<Option<HelperRegistration>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.find(&rtxn, request_id, helper_id)?)
    }

    fn registrations(&self, request_id: &RequestId) -> Result<Vec<HelperRegistration>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut rows = Vec::new();
        for (_, val) in scan_prefix(&self.registrations_db, &rtxn, &str_key(request_id.as_str())?)? {
            rows.push(bincode::deserialize(&val).map_err(LmdbError::from)?);
        }
        Ok(rows)
    }

    fn put_withdrawal(&self, withdrawal: &RegistrationWithdrawal) -> Result<bool, StoreError> {
        let key = pair_key(withdrawal.request_id.as_str(), withdrawal.helper_id.as_str())?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .withdrawals_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Ok(false);
        }
        let bytes = bincode::serialize(withdrawal).map_err(LmdbError::from)?;
        self.withdrawals_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn get_withdrawal(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
    ) -> Result<Option<RegistrationWithdrawal>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .withdrawals_db
            .get(&rtxn, &pair_key(request_id.as_str(), helper_id.as_str())?)
            .map_err(LmdbError::from)?
        {
            Some(val) => Ok(Some(bincode::deserialize(val).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 0, 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    #[test]
    fn ranks_are_dense_per_request() {
        let (_dir, env) = temp_env();
        let store = env.registration_store();
        let r1 = RequestId::new("r1");
        let r2 = RequestId::new("r2");
        let now = Timestamp::from_secs(1);

        for (i, helper) in ["a", "b", "c"].iter().enumerate() {
            let (reg, created) = store.register_next(&r1, &AccountId::new(*helper), now).unwrap();
            assert_eq!(reg.rank, i as u32 + 1);
            assert!(created);
        }
        let (other, _) = store.register_next(&r2, &AccountId::new("a"), now).unwrap();
        assert_eq!(other.rank, 1);

        let (again, created) = store.register_next(&r1, &AccountId::new("b"), now).unwrap();
        assert_eq!(again.rank, 2);
        assert!(!created);

        let ranks: Vec<u32> = store.registrations(&r1).unwrap().iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn ranks_sort_numerically_past_255() {
        let (_dir, env) = temp_env();
        let store = env.registration_store();
        let req = RequestId::new("busy");
        for i in 0..300 {
            store
                .register_next(&req, &AccountId::new(format!("h{i}")), Timestamp::EPOCH)
                .unwrap();
        }
        let rows = store.registrations(&req).unwrap();
        assert_eq!(rows.len(), 300);
        assert!(rows.windows(2).all(|w| w[0].rank + 1 == w[1].rank));
    }

    #[test]
    fn withdrawal_is_recorded_once() {
        let (_dir, env) = temp_env();
        let store = env.registration_store();
        let w = RegistrationWithdrawal {
            request_id: RequestId::new("r"),
            helper_id: AccountId::new("h"),
            withdrawn_at: Timestamp::from_secs(9),
        };
        assert!(store.put_withdrawal(&w).unwrap());
        assert!(!store.put_withdrawal(&w).unwrap());
        assert_eq!(
            store.get_withdrawal(&w.request_id, &w.helper_id).unwrap(),
            Some(w)
        );
    }
}
