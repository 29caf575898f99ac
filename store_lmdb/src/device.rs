//! LMDB implementation of DeviceStore.
//!
//! Key format: `len(fingerprint) ++ fingerprint ++ len(account) ++ account`.
//! A secondary index keyed `account ++ fingerprint` (same encoding) serves
//! per-account lookups.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};

use samaritan_store::{DeviceStore, StoreError};
use samaritan_types::{AccountId, DeviceBinding, Fingerprint};

use crate::keys::{pair_key, scan_prefix, str_key};
use crate::LmdbError;

pub struct LmdbDeviceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) bindings_db: Database<Bytes, Bytes>,
    pub(crate) account_bindings_db: Database<Bytes, Bytes>,
}

fn binding_key(fingerprint: &Fingerprint, account_id: &AccountId) -> Result<Vec<u8>, LmdbError> {
    pair_key(fingerprint.as_str(), account_id.as_str())
}

impl LmdbDeviceStore {
    fn by_fingerprint(
        &self,
        txn: &RoTxn,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<DeviceBinding>, LmdbError> {
        scan_prefix(&self.bindings_db, txn, &str_key(fingerprint.as_str())?)?
            .into_iter()
            .map(|(_, val)| bincode::deserialize(&val).map_err(LmdbError::from))
            .collect()
    }

    fn by_account(&self, txn: &RoTxn, account_id: &AccountId) -> Result<Vec<DeviceBinding>, LmdbError> {
        let mut bindings = Vec::new();
        for (key, _) in scan_prefix(&self.account_bindings_db, txn, &str_key(account_id.as_str())?)? {
            // The index key is `account ++ fingerprint`; swap to the primary key.
            let fingerprint_part = &key[2 + account_id.as_str().len()..];
            let mut primary = fingerprint_part.to_vec();
            primary.extend_from_slice(&str_key(account_id.as_str())?);
            let val = self
                .bindings_db
                .get(txn, &primary)?
                .ok_or_else(|| LmdbError::Corruption("dangling account binding index".into()))?;
            bindings.push(bincode::deserialize(val)?);
        }
        Ok(bindings)
    }

    fn write(&self, wtxn: &mut RwTxn, binding: &DeviceBinding) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(binding)?;
        self.bindings_db.put(
            wtxn,
            &binding_key(&binding.fingerprint, &binding.account_id)?,
            &bytes,
        )?;
        self.account_bindings_db.put(
            wtxn,
            &pair_key(binding.account_id.as_str(), binding.fingerprint.as_str())?,
            &[],
        )?;
        Ok(())
    }
}

impl DeviceStore for LmdbDeviceStore {
    fn get_binding(
        &self,
        fingerprint: &Fingerprint,
        account_id: &AccountId,
    ) -> Result<Option<DeviceBinding>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .bindings_db
            .get(&rtxn, &binding_key(fingerprint, account_id)?)
            .map_err(LmdbError::from)?
        {
            Some(val) => Ok(Some(bincode::deserialize(val).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn bindings_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<DeviceBinding>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.by_fingerprint(&rtxn, fingerprint)?)
    }

    fn bindings_for_account(&self, account_id: &AccountId) -> Result<Vec<DeviceBinding>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.by_account(&rtxn, account_id)?)
    }

    fn put_binding(&self, binding: &DeviceBinding) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.write(&mut wtxn, binding)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn upsert_binding_with(
        &self,
        fingerprint: &Fingerprint,
        account_id: &AccountId,
        plan: &mut dyn FnMut(&[DeviceBinding], &[DeviceBinding]) -> Option<DeviceBinding>,
    ) -> Result<Option<DeviceBinding>, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let by_fingerprint = self.by_fingerprint(&wtxn, fingerprint)?;
        let by_account = self.by_account(&wtxn, account_id)?;
        let Some(binding) = plan(&by_fingerprint, &by_account) else {
            return Ok(None);
        };
        self.write(&mut wtxn, &binding)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(Some(binding))
    }

    fn block_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Vec<DeviceBinding>, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut blocked = self.by_fingerprint(&wtxn, fingerprint)?;
        for binding in &mut blocked {
            binding.is_blocked = true;
            self.write(&mut wtxn, binding)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use samaritan_types::{DeviceMeta, Timestamp};

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 0, 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    fn fp(n: u8) -> Fingerprint {
        Fingerprint::parse(&format!("{:032x}", n)).unwrap()
    }

    fn binding(fingerprint: &Fingerprint, account: &str) -> DeviceBinding {
        DeviceBinding {
            fingerprint: fingerprint.clone(),
            account_id: AccountId::new(account),
            is_primary: false,
            is_blocked: false,
            first_seen_at: Timestamp::EPOCH,
            last_used_at: Timestamp::EPOCH,
            meta: DeviceMeta::default(),
        }
    }

    #[test]
    fn lookups_by_both_keys() {
        let (_dir, env) = temp_env();
        let store = env.device_store();
        store.put_binding(&binding(&fp(1), "a")).unwrap();
        store.put_binding(&binding(&fp(1), "b")).unwrap();
        store.put_binding(&binding(&fp(2), "a")).unwrap();

        assert_eq!(store.bindings_for_fingerprint(&fp(1)).unwrap().len(), 2);
        let own = store.bindings_for_account(&AccountId::new("a")).unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|b| b.account_id.as_str() == "a"));
        assert!(store.get_binding(&fp(2), &AccountId::new("b")).unwrap().is_none());
    }

    #[test]
    fn upsert_sees_current_rows() {
        let (_dir, env) = temp_env();
        let store = env.device_store();
        store.put_binding(&binding(&fp(1), "a")).unwrap();

        let written = store
            .upsert_binding_with(&fp(1), &AccountId::new("b"), &mut |by_fp, own| {
                assert_eq!(by_fp.len(), 1);
                assert!(own.is_empty());
                Some(binding(&fp(1), "b"))
            })
            .unwrap();
        assert!(written.is_some());
        let skipped = store
            .upsert_binding_with(&fp(3), &AccountId::new("c"), &mut |_, _| None)
            .unwrap();
        assert!(skipped.is_none());
        assert!(store.bindings_for_account(&AccountId::new("c")).unwrap().is_empty());
    }

    #[test]
    fn block_marks_every_account() {
        let (_dir, env) = temp_env();
        let store = env.device_store();
        store.put_binding(&binding(&fp(1), "a")).unwrap();
        store.put_binding(&binding(&fp(1), "b")).unwrap();
        store.put_binding(&binding(&fp(2), "a")).unwrap();

        let blocked = store.block_fingerprint(&fp(1)).unwrap();
        assert_eq!(blocked.len(), 2);
        assert!(store
            .bindings_for_fingerprint(&fp(1))
            .unwrap()
            .iter()
            .all(|b| b.is_blocked));
        assert!(!store.get_binding(&fp(2), &AccountId::new("a")).unwrap().unwrap().is_blocked);
    }
}
