//! Account record: the integrity-relevant slice of a marketplace identity.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::net::IpAddr;

use crate::{AccountId, Timestamp, TypesError};

/// Moderation flags. Accounts are never hard-deleted, only flagged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlags {
    /// Under review: set by fraud detection or manual action.
    pub is_flagged: bool,
    /// Invisible to other participants without being told.
    pub is_shadow_banned: bool,
    pub is_banned: bool,
    pub is_blocked: bool,
}

/// The most recent accepted location fix for an account.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LastKnownLocation {
    pub lat: f64,
    pub lng: f64,
    pub observed_at: Timestamp,
}

/// One entry of an account's IP history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpObservation {
    pub ip: IpAddr,
    pub seen_at: Timestamp,
}

/// Bounded, most-recent-last log of IP addresses an account logged in from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpHistory {
    entries: VecDeque<IpObservation>,
}

impl IpHistory {
    /// Maximum number of retained entries; the oldest is evicted first.
    pub const CAPACITY: usize = 20;

    pub fn push(&mut self, ip: IpAddr, seen_at: Timestamp) {
        if self.entries.len() == Self::CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(IpObservation { ip, seen_at });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&IpObservation> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpObservation> {
        self.entries.iter()
    }

    /// Number of times the address changed between consecutive entries
    /// observed at or after `since`.
    pub fn changes_since(&self, since: Timestamp) -> usize {
        let recent: Vec<&IpObservation> =
            self.entries.iter().filter(|o| o.seen_at >= since).collect();
        recent.windows(2).filter(|w| w[0].ip != w[1].ip).count()
    }
}

/// Integrity state of a participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Trust score, always within `0..=100`.
    pub integrity_score: u8,
    /// Accumulated penalties. Only an external administrative reset lowers it.
    pub strike_count: u32,
    pub flags: AccountFlags,
    pub last_known_location: Option<LastKnownLocation>,
    pub registered_ip: Option<IpAddr>,
    pub last_login_ip: Option<IpAddr>,
    #[serde(default)]
    pub ip_history: IpHistory,
    pub created_at: Timestamp,
}

impl Account {
    /// Score assigned at signup.
    pub const DEFAULT_SCORE: u8 = 50;
    pub const MAX_SCORE: u8 = 100;

    /// A freshly signed-up account with the default score and no history.
    pub fn new(id: AccountId, created_at: Timestamp) -> Self {
        Self {
            id,
            integrity_score: Self::DEFAULT_SCORE,
            strike_count: 0,
            flags: AccountFlags::default(),
            last_known_location: None,
            registered_ip: None,
            last_login_ip: None,
            ip_history: IpHistory::default(),
            created_at,
        }
    }

    /// Same as [`Account::new`] but with an explicit starting score.
    pub fn with_score(id: AccountId, score: u32, created_at: Timestamp) -> Result<Self, TypesError> {
        if score > Self::MAX_SCORE as u32 {
            return Err(TypesError::ScoreOutOfRange(score));
        }
        let mut account = Self::new(id, created_at);
        account.integrity_score = score as u8;
        Ok(account)
    }

    /// Whether the account itself (not a device it used) is barred from the platform.
    pub fn is_sanctioned(&self) -> bool {
        self.flags.is_banned || self.flags.is_shadow_banned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn new_account_defaults() {
        let a = Account::new(AccountId::new("a"), Timestamp::EPOCH);
        assert_eq!(a.integrity_score, 50);
        assert_eq!(a.strike_count, 0);
        assert_eq!(a.flags, AccountFlags::default());
        assert!(a.last_known_location.is_none());
    }

    #[test]
    fn with_score_rejects_over_100() {
        assert!(Account::with_score(AccountId::new("a"), 101, Timestamp::EPOCH).is_err());
        assert!(Account::with_score(AccountId::new("a"), 100, Timestamp::EPOCH).is_ok());
    }

    #[test]
    fn ip_history_is_capped_and_most_recent_last() {
        let mut h = IpHistory::default();
        for i in 0..25u8 {
            h.push(ip(i), Timestamp::from_secs(i as u64));
        }
        assert_eq!(h.len(), IpHistory::CAPACITY);
        assert_eq!(h.latest().unwrap().ip, ip(24));
        assert_eq!(h.iter().next().unwrap().ip, ip(5));
    }

    #[test]
    fn ip_history_counts_changes_in_window() {
        let mut h = IpHistory::default();
        h.push(ip(1), Timestamp::from_secs(10));
        h.push(ip(2), Timestamp::from_secs(100));
        h.push(ip(2), Timestamp::from_secs(110));
        h.push(ip(3), Timestamp::from_secs(120));
        assert_eq!(h.changes_since(Timestamp::EPOCH), 2);
        assert_eq!(h.changes_since(Timestamp::from_secs(105)), 1);
    }
}
