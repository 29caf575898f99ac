use thiserror::Error;

use samaritan_device::DeviceError;
use samaritan_location::LocationRejection;
use samaritan_ranking::RankError;
use samaritan_store::StoreError;
use samaritan_store_lmdb::LmdbError;
use samaritan_trust::TrustError;
use samaritan_types::AccountId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("location rejected: {0}")]
    Location(#[from] LocationRejection),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("trust error: {0}")]
    Trust(#[from] TrustError),

    #[error("rank error: {0}")]
    Rank(#[from] RankError),

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine task failed: {0}")]
    Task(String),

    #[error("engine is shutting down")]
    ShuttingDown,
}

impl EngineError {
    /// Message safe to show the acting user, for domain rejections.
    ///
    /// Infrastructure failures get `None`; the caller shows its own generic
    /// error for those.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Location(rejection) => Some(rejection.user_message()),
            Self::Device(err) => Some(err.user_message()),
            Self::Rank(RankError::RequestClosed(_)) => Some("This request is no longer accepting helpers."),
            Self::Rank(RankError::OwnRequest(_)) => Some("You can't offer help on your own request."),
            Self::Rank(RankError::RequestNotFound(_)) => Some("This request could not be found."),
            Self::Rank(RankError::HelperNotFound(_)) => Some("This helper account could not be found."),
            Self::Rank(RankError::NotRegistered { .. }) => {
                Some("You are not registered as a helper on this request.")
            }
            Self::AccountNotFound(_) => Some("This account could not be found."),
            _ => None,
        }
    }

    /// Whether the failure came from storage or the runtime rather than
    /// from a domain rule.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::Lmdb(_)
                | Self::Io(_)
                | Self::Task(_)
                | Self::ShuttingDown
                | Self::Rank(RankError::Store(_))
        )
    }
}
