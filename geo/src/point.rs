//! Validated coordinate pair.

use serde::{Deserialize, Serialize};

use crate::{bearing_degrees, distance_km, is_valid_coordinate, GeoError};

/// A latitude/longitude pair known to be valid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if is_valid_coordinate(lat, lng) {
            Ok(Self { lat, lng })
        } else {
            Err(GeoError::InvalidCoordinate { lat, lng })
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        // Both points are validated at construction.
        distance_km(self.lat, self.lng, other.lat, other.lng).unwrap_or(f64::NAN)
    }

    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        bearing_degrees(self.lat, self.lng, other.lat, other.lng).unwrap_or(f64::NAN)
    }
}
