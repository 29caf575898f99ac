//! Shadow visibility gate.
//!
//! An invisible account is excluded from every other participant's listings
//! and matches while its own UI keeps working normally; the account is never
//! told.

use samaritan_types::{Account, AccountId, TrustParams};

/// Whether other participants must not see `account`.
pub fn is_invisible(account: &Account, params: &TrustParams) -> bool {
    account.flags.is_shadow_banned
        || account.flags.is_banned
        || account.strike_count >= params.strike_limit
        || account.integrity_score < params.invisibility_threshold
}

/// Keep the accounts `viewer` may see. The viewer's own account always stays.
pub fn filter_visible<'a>(
    viewer: &AccountId,
    accounts: impl IntoIterator<Item = &'a Account>,
    params: &TrustParams,
) -> Vec<&'a Account> {
    accounts
        .into_iter()
        .filter(|a| &a.id == viewer || !is_invisible(a, params))
        .collect()
}
