//! Login session storage trait.

use std::net::IpAddr;

use crate::StoreError;
use samaritan_types::{AccountId, SessionRecord, Timestamp};

pub trait SessionStore: Send + Sync {
    fn record_session(&self, session: &SessionRecord) -> Result<(), StoreError>;

    /// Sessions from `ip` created at or after `since`.
    fn sessions_for_ip(&self, ip: IpAddr, since: Timestamp) -> Result<Vec<SessionRecord>, StoreError>;

    /// Sessions of `account_id` created at or after `since`.
    fn sessions_for_account(
        &self,
        account_id: &AccountId,
        since: Timestamp,
    ) -> Result<Vec<SessionRecord>, StoreError>;
}
