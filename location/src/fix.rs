//! Client-reported location input.

use serde::{Deserialize, Serialize};

use samaritan_types::Timestamp;

/// A single GPS fix as reported by the browser geolocation API.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub lat: f64,
    pub lng: f64,
    /// Horizontal accuracy radius in metres.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    #[serde(default)]
    pub altitude_m: Option<f64>,
    /// Device-reported ground speed in metres per second.
    #[serde(default)]
    pub speed_mps: Option<f64>,
    pub observed_at: Timestamp,
}

impl LocationFix {
    pub fn new(lat: f64, lng: f64, observed_at: Timestamp) -> Self {
        Self {
            lat,
            lng,
            accuracy_m: None,
            altitude_m: None,
            speed_mps: None,
            observed_at,
        }
    }

    pub fn with_accuracy(mut self, metres: f64) -> Self {
        self.accuracy_m = Some(metres);
        self
    }

    pub fn with_altitude(mut self, metres: f64) -> Self {
        self.altitude_m = Some(metres);
        self
    }

    pub fn with_speed(mut self, mps: f64) -> Self {
        self.speed_mps = Some(mps);
        self
    }

    /// Optional readings that are NaN or infinite are treated as absent.
    pub(crate) fn accuracy(&self) -> Option<f64> {
        self.accuracy_m.filter(|v| v.is_finite() && *v >= 0.0)
    }

    pub(crate) fn altitude(&self) -> Option<f64> {
        self.altitude_m.filter(|v| v.is_finite())
    }

    pub(crate) fn speed(&self) -> Option<f64> {
        self.speed_mps.filter(|v| v.is_finite() && *v >= 0.0)
    }
}

/// A site the fix must be close to, e.g. the location of a help request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProximityTarget {
    pub lat: f64,
    pub lng: f64,
    /// Falls back to the configured default radius when absent.
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

impl ProximityTarget {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            max_distance_km: None,
        }
    }

    pub fn within_km(mut self, km: f64) -> Self {
        self.max_distance_km = Some(km);
        self
    }
}
