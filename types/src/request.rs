//! Help requests, helper registrations and login sessions.
//!
//! Help requests and sessions are owned by the surrounding marketplace; the
//! engine only reads them. Registrations are written once and never mutated.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::{AccountId, RequestId, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    Closed,
    Expired,
}

/// The slice of a help request the engine reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HelpRequest {
    pub id: RequestId,
    pub requester_id: AccountId,
    pub lat: f64,
    pub lng: f64,
    pub status: RequestStatus,
    pub created_at: Timestamp,
    /// Requests past this instant accept no new helpers even if still `Open`.
    pub expires_at: Option<Timestamp>,
}

impl HelpRequest {
    /// Whether helpers may still register at `now`.
    pub fn accepts_helpers(&self, now: Timestamp) -> bool {
        self.status == RequestStatus::Open && self.expires_at.map_or(true, |exp| now < exp)
    }
}

/// A helper's "I will help" declaration with its arrival-order rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperRegistration {
    pub request_id: RequestId,
    pub helper_id: AccountId,
    /// 1-based, dense, never reused within a request.
    pub rank: u32,
    pub registered_at: Timestamp,
}

/// Tombstone recorded when a helper withdraws. The registration row and its
/// rank stay untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationWithdrawal {
    pub request_id: RequestId,
    pub helper_id: AccountId,
    pub withdrawn_at: Timestamp,
}

/// A login session as seen by the session store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub account_id: AccountId,
    pub ip: IpAddr,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: RequestStatus, expires_at: Option<u64>) -> HelpRequest {
        HelpRequest {
            id: RequestId::new("r1"),
            requester_id: AccountId::new("owner"),
            lat: 0.0,
            lng: 0.0,
            status,
            created_at: Timestamp::EPOCH,
            expires_at: expires_at.map(Timestamp::from_secs),
        }
    }

    #[test]
    fn open_request_without_expiry_accepts() {
        assert!(request(RequestStatus::Open, None).accepts_helpers(Timestamp::from_secs(99)));
    }

    #[test]
    fn expired_by_time_rejects() {
        let r = request(RequestStatus::Open, Some(100));
        assert!(r.accepts_helpers(Timestamp::from_secs(99)));
        assert!(!r.accepts_helpers(Timestamp::from_secs(100)));
    }

    #[test]
    fn closed_rejects() {
        assert!(!request(RequestStatus::Closed, None).accepts_helpers(Timestamp::EPOCH));
        assert!(!request(RequestStatus::Expired, None).accepts_helpers(Timestamp::EPOCH));
    }
}
