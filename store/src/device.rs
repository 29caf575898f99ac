//! Device binding storage trait.

use crate::StoreError;
use samaritan_types::{AccountId, DeviceBinding, Fingerprint};

/// Trait for device binding storage. Bindings are keyed by
/// `(fingerprint, account_id)` and never deleted.
pub trait DeviceStore: Send + Sync {
    fn get_binding(
        &self,
        fingerprint: &Fingerprint,
        account_id: &AccountId,
    ) -> Result<Option<DeviceBinding>, StoreError>;

    /// Every binding of `fingerprint`, any account.
    fn bindings_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<DeviceBinding>, StoreError>;

    /// Every binding held by `account_id`, blocked ones included.
    fn bindings_for_account(&self, account_id: &AccountId) -> Result<Vec<DeviceBinding>, StoreError>;

    fn put_binding(&self, binding: &DeviceBinding) -> Result<(), StoreError>;

    /// Atomically plan and persist a binding of `fingerprint` to `account_id`.
    ///
    /// `plan` receives every binding of the fingerprint and every binding of
    /// the account, read in the same transaction; the row it returns is
    /// written, `None` writes nothing.
    fn upsert_binding_with(
        &self,
        fingerprint: &Fingerprint,
        account_id: &AccountId,
        plan: &mut dyn FnMut(&[DeviceBinding], &[DeviceBinding]) -> Option<DeviceBinding>,
    ) -> Result<Option<DeviceBinding>, StoreError>;

    /// Mark every binding of `fingerprint` blocked and return them.
    fn block_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Vec<DeviceBinding>, StoreError>;
}
