use thiserror::Error;

use samaritan_types::{AuditEvent, LocationParams, Timestamp};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("invalid location: lat {lat}, lng {lng}")]
    InvalidLocation { lat: f64, lng: f64 },

    #[error("fix observed at {observed_at} is {ahead_ms} ms ahead of server time {now}")]
    FutureFix {
        observed_at: Timestamp,
        now: Timestamp,
        ahead_ms: u64,
    },

    #[error("reported speed {speed_kmh:.1} km/h is physically implausible")]
    ImpossibleSpeed { speed_kmh: f64 },

    #[error("moved {distance_km:.3} km in {elapsed_ms} ms")]
    TeleportDetected { distance_km: f64, elapsed_ms: u64 },

    #[error("implied travel speed {speed_kmh:.1} km/h ({distance_km:.3} km in {elapsed_ms} ms)")]
    ImpossibleTravel {
        speed_kmh: f64,
        distance_km: f64,
        elapsed_ms: u64,
    },

    #[error("{distance_km:.3} km from target, limit {max_km:.3} km")]
    TooFarFromTarget { distance_km: f64, max_km: f64 },

    #[error("fix observed at {observed_at} predates stored fix at {stored_at}")]
    StaleFix {
        observed_at: Timestamp,
        stored_at: Timestamp,
    },
}

impl LocationError {
    /// Short snake_case name, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidLocation { .. } => "invalid_location",
            Self::FutureFix { .. } => "future_fix",
            Self::ImpossibleSpeed { .. } => "impossible_speed",
            Self::TeleportDetected { .. } => "teleport_detected",
            Self::ImpossibleTravel { .. } => "impossible_travel",
            Self::TooFarFromTarget { .. } => "too_far_from_target",
            Self::StaleFix { .. } => "stale_fix",
        }
    }

    /// Rejections that are themselves evidence of attempted fraud: they flag
    /// the account and raise a high-severity audit entry.
    pub fn is_fraud_signal(&self) -> bool {
        matches!(
            self,
            Self::FutureFix { .. }
                | Self::ImpossibleSpeed { .. }
                | Self::TeleportDetected { .. }
                | Self::ImpossibleTravel { .. }
        )
    }

    /// Audit evidence for fraud rejections; `None` for ordinary rejections.
    pub fn fraud_evidence(&self, params: &LocationParams) -> Option<AuditEvent> {
        match *self {
            Self::FutureFix { ahead_ms, .. } => Some(AuditEvent::FutureTimestamp { ahead_ms }),
            Self::ImpossibleSpeed { speed_kmh } => Some(AuditEvent::ImpossibleSpeed {
                reported_kmh: speed_kmh,
                ceiling_kmh: params.max_speed_kmh,
            }),
            Self::TeleportDetected {
                distance_km,
                elapsed_ms,
            } => Some(AuditEvent::TeleportDetected {
                distance_km,
                elapsed_ms,
            }),
            Self::ImpossibleTravel {
                speed_kmh,
                distance_km,
                elapsed_ms,
            } => Some(AuditEvent::ImpossibleTravel {
                speed_kmh,
                distance_km,
                elapsed_ms,
            }),
            _ => None,
        }
    }

    /// Message safe to show the acting user. Fraud outcomes get a generic
    /// denial so detection thresholds are not revealed.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidLocation { .. } => "We couldn't read your location. Please try again.",
            Self::TooFarFromTarget { .. } => "You need to be closer to the request location.",
            Self::StaleFix { .. } => "Your location is out of date. Please refresh and try again.",
            Self::FutureFix { .. }
            | Self::ImpossibleSpeed { .. }
            | Self::TeleportDetected { .. }
            | Self::ImpossibleTravel { .. } => {
                "We couldn't verify your location right now. Please try again later."
            }
        }
    }
}
