use samaritan_store::StoreError;
use samaritan_types::{AccountId, RequestId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankError {
    #[error("help request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("helper account not found: {0}")]
    HelperNotFound(AccountId),

    #[error("help request {0} no longer accepts helpers")]
    RequestClosed(RequestId),

    #[error("account {0} cannot help on its own request")]
    OwnRequest(AccountId),

    #[error("helper {helper} is not registered on request {request}")]
    NotRegistered { request: RequestId, helper: AccountId },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RankError {
    /// Whether the caller referenced something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RequestNotFound(_) | Self::HelperNotFound(_) | Self::NotRegistered { .. }
        )
    }
}
