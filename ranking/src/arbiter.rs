//! The rank arbiter.
//!
//! Dense numbering relies on [`RegistrationStore::register_next`] being a
//! single atomic count-and-insert. Callers that also want per-request
//! serialization above the store (the engine does) take their lock before
//! calling in.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use samaritan_store::{AccountStore, HelpRequestStore, RegistrationStore, StoreError};
use samaritan_types::{
    AccountId, HelpRequest, HelperRegistration, RankingParams, RegistrationWithdrawal, RequestId,
    Timestamp,
};

use crate::RankError;

/// Result of a registration attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankGrant {
    pub rank: u32,
    pub contact_unlocked: bool,
    /// `false` when the helper was already registered and this call was a replay.
    pub newly_registered: bool,
}

pub struct RankArbiter {
    requests: Arc<dyn HelpRequestStore>,
    accounts: Arc<dyn AccountStore>,
    registrations: Arc<dyn RegistrationStore>,
    params: RankingParams,
}

impl RankArbiter {
    pub fn new(
        requests: Arc<dyn HelpRequestStore>,
        accounts: Arc<dyn AccountStore>,
        registrations: Arc<dyn RegistrationStore>,
        params: RankingParams,
    ) -> Self {
        Self {
            requests,
            accounts,
            registrations,
            params,
        }
    }

    pub fn params(&self) -> &RankingParams {
        &self.params
    }

    /// Whether `rank` unlocks the requester's contact under the current K.
    pub fn unlocks_contact(&self, rank: u32) -> bool {
        rank <= self.params.contact_unlock_threshold
    }

    /// Register `helper_id` on `request_id`.
    ///
    /// A repeated call for the same pair returns the existing rank, even once
    /// the request has closed.
    pub fn register(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
        now: Timestamp,
    ) -> Result<RankGrant, RankError> {
        let request = self.load_request(request_id)?;
        if !self.accounts.exists(helper_id)? {
            return Err(RankError::HelperNotFound(helper_id.clone()));
        }

        if let Some(existing) = self.registrations.get_registration(request_id, helper_id)? {
            return Ok(self.grant(&existing, false));
        }

        if &request.requester_id == helper_id {
            return Err(RankError::OwnRequest(helper_id.clone()));
        }
        if !request.accepts_helpers(now) {
            return Err(RankError::RequestClosed(request_id.clone()));
        }

        let (registration, created) = self.registrations.register_next(request_id, helper_id, now)?;
        debug!(
            request = %request_id,
            helper = %helper_id,
            rank = registration.rank,
            created,
            "helper registered"
        );
        Ok(self.grant(&registration, created))
    }

    /// Record that `helper_id` withdrew from `request_id`.
    ///
    /// The registration and its rank stay in place and no other rank moves.
    /// Returns `false` if the helper had already withdrawn.
    pub fn withdraw(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
        now: Timestamp,
    ) -> Result<bool, RankError> {
        if self
            .registrations
            .get_registration(request_id, helper_id)?
            .is_none()
        {
            return Err(RankError::NotRegistered {
                request: request_id.clone(),
                helper: helper_id.clone(),
            });
        }
        let recorded = self.registrations.put_withdrawal(&RegistrationWithdrawal {
            request_id: request_id.clone(),
            helper_id: helper_id.clone(),
            withdrawn_at: now,
        })?;
        debug!(request = %request_id, helper = %helper_id, recorded, "helper withdrew");
        Ok(recorded)
    }

    /// Registrations of `request_id` in rank order.
    pub fn registrations(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<HelperRegistration>, RankError> {
        self.load_request(request_id)?;
        Ok(self.registrations.registrations(request_id)?)
    }

    fn load_request(&self, request_id: &RequestId) -> Result<HelpRequest, RankError> {
        match self.requests.get_request(request_id) {
            Ok(request) => Ok(request),
            Err(StoreError::NotFound(_)) => Err(RankError::RequestNotFound(request_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn grant(&self, registration: &HelperRegistration, newly_registered: bool) -> RankGrant {
        RankGrant {
            rank: registration.rank,
            contact_unlocked: self.unlocks_contact(registration.rank),
            newly_registered,
        }
    }
}
