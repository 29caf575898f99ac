//! Results of a full validate-and-commit round.
//!
//! A fraud rejection both refuses the fix and mutates state (the account is
//! flagged, an audit entry is written). That side effect travels inside the
//! rejection so callers and tests can see it directly.

use serde::{Deserialize, Serialize};

use samaritan_types::{AuditReceipt, LastKnownLocation};

use crate::{LocationError, SpoofWarning};

/// An accepted fix after it was persisted as the account's last-known location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationOutcome {
    pub confidence: f64,
    pub warnings: Vec<SpoofWarning>,
    pub stored: LastKnownLocation,
    pub distance_to_target_km: Option<f64>,
}

/// What a fraud rejection did besides refusing the fix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudSideEffect {
    pub audit: AuditReceipt,
    pub account_flagged: bool,
}

/// A refused fix. `side_effect` is `Some` exactly for fraud rejections.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationRejection {
    pub error: LocationError,
    pub side_effect: Option<FraudSideEffect>,
}

impl LocationRejection {
    pub fn plain(error: LocationError) -> Self {
        Self {
            error,
            side_effect: None,
        }
    }

    pub fn with_side_effect(error: LocationError, side_effect: FraudSideEffect) -> Self {
        Self {
            error,
            side_effect: Some(side_effect),
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.error.user_message()
    }
}

impl std::fmt::Display for LocationRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.side_effect {
            Some(effect) => write!(f, "{} (account flagged, {:?})", self.error, effect.audit),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for LocationRejection {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
