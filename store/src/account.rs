//! Account storage trait.

use crate::StoreError;
use samaritan_types::{Account, AccountId, AdminActionEntry, AuditEntryId, SecurityAuditEntry};

/// Whether an [`AccountStore::update_account`] closure wants its edits kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateDecision {
    Commit,
    Discard,
}

/// Audit and admin-log entries committed in the same transaction as an
/// account change.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    pub audit: Vec<SecurityAuditEntry>,
    pub admin: Vec<AdminActionEntry>,
}

impl Journal {
    pub fn is_empty(&self) -> bool {
        self.audit.is_empty() && self.admin.is_empty()
    }
}

/// Trait for account storage operations.
pub trait AccountStore: Send + Sync {
    fn get_account(&self, id: &AccountId) -> Result<Account, StoreError>;
    fn put_account(&self, account: &Account) -> Result<(), StoreError>;
    fn exists(&self, id: &AccountId) -> Result<bool, StoreError>;

    /// Atomic read-modify-write of one account.
    ///
    /// `f` sees the current row; returning `Some(journal)` commits the edited
    /// row together with the journal entries, `None` leaves everything
    /// untouched. Returns the row as stored after the call and the ids assigned
    /// to the journal's audit entries.
    fn update_account_journaled(
        &self,
        id: &AccountId,
        f: &mut dyn FnMut(&mut Account) -> Option<Journal>,
    ) -> Result<(Account, Vec<AuditEntryId>), StoreError>;

    /// Atomic read-modify-write of one account without journal entries.
    fn update_account(
        &self,
        id: &AccountId,
        f: &mut dyn FnMut(&mut Account) -> UpdateDecision,
    ) -> Result<Account, StoreError> {
        self.update_account_journaled(id, &mut |account| match f(account) {
            UpdateDecision::Commit => Some(Journal::default()),
            UpdateDecision::Discard => None,
        })
        .map(|(account, _)| account)
    }

    /// Fetch the accounts that exist among `ids`, skipping unknown ones.
    fn get_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_account(id) {
                Ok(account) => found.push(account),
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }
}
