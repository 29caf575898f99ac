//! LMDB implementation of HelpRequestStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use samaritan_store::{HelpRequestStore, StoreError};
use samaritan_types::{HelpRequest, RequestId};

use crate::keys::str_key;
use crate::LmdbError;

pub struct LmdbHelpRequestStore {
    pub(crate) env: Arc<Env>,
    pub(crate) requests_db: Database<Bytes, Bytes>,
}

impl HelpRequestStore for LmdbHelpRequestStore {
    fn get_request(&self, id: &RequestId) -> Result<HelpRequest, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .requests_db
            .get(&rtxn, &str_key(id.as_str())?)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("request {id}")))?;
        let request: HelpRequest = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(request)
    }

    fn put_request(&self, request: &HelpRequest) -> Result<(), StoreError> {
        let bytes = bincode::serialize(request).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.requests_db
            .put(&mut wtxn, &str_key(request.id.as_str())?, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
