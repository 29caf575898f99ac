//! Helper registration storage trait.

use crate::StoreError;
use samaritan_types::{AccountId, HelperRegistration, RegistrationWithdrawal, RequestId, Timestamp};

pub trait RegistrationStore: Send + Sync {
    /// Register `helper_id` on `request_id` with the next dense rank.
    ///
    /// Looks up an existing row, counts the request's registrations and
    /// inserts in one atomic step. Returns the registration and whether it was
    /// created by this call; an existing row is returned unchanged.
    fn register_next(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
        now: Timestamp,
    ) -> Result<(HelperRegistration, bool), StoreError>;

    fn get_registration(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
    ) -> Result<Option<HelperRegistration>, StoreError>;

    /// Registrations of `request_id` in rank order.
    fn registrations(&self, request_id: &RequestId) -> Result<Vec<HelperRegistration>, StoreError>;

    /// Record a withdrawal tombstone. Returns `false` if one already existed.
    fn put_withdrawal(&self, withdrawal: &RegistrationWithdrawal) -> Result<bool, StoreError>;

    fn get_withdrawal(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
    ) -> Result<Option<RegistrationWithdrawal>, StoreError>;
}
