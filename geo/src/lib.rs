//! Pure geodesic helpers on a spherical Earth.
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_KM`]. Every function validates its inputs and is free of
//! side effects.

pub mod error;
pub mod point;

pub use error::GeoError;
pub use point::GeoPoint;

/// Mean Earth radius used for all great-circle computations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Whether `(lat, lng)` is a finite coordinate within lat ∈ [-90, 90] and lng ∈ [-180, 180].
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

fn ensure_valid(lat: f64, lng: f64) -> Result<(), GeoError> {
    if is_valid_coordinate(lat, lng) {
        Ok(())
    } else {
        Err(GeoError::InvalidCoordinate { lat, lng })
    }
}

/// Great-circle distance in kilometres between two coordinates.
///
/// Symmetric, and `distance_km(a, a) == 0` up to floating-point noise.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Result<f64, GeoError> {
    ensure_valid(lat1, lng1)?;
    ensure_valid(lat2, lng2)?;

    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();

    let a = (dlat / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    Ok(EARTH_RADIUS_KM * c)
}

/// Initial bearing from the first coordinate to the second, in degrees `[0, 360)`.
pub fn bearing_degrees(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Result<f64, GeoError> {
    ensure_valid(lat1, lng1)?;
    ensure_valid(lat2, lng2)?;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let y = dlng.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlng.cos();
    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs.
    Ok(if bearing >= 360.0 { 0.0 } else { bearing })
}

/// Average speed in km/h needed to cover `distance_km` in `elapsed_ms`.
///
/// Returns `None` when no time has elapsed.
pub fn implied_speed_kmh(distance_km: f64, elapsed_ms: u64) -> Option<f64> {
    if elapsed_ms == 0 {
        return None;
    }
    let hours = elapsed_ms as f64 / 3_600_000.0;
    Some(distance_km / hours)
}

/// Number of significant decimal places in `value`, capped at 12.
///
/// `12.5` → 1, `40.0` → 0, `-33.868820` → 5.
pub fn decimal_places(value: f64) -> u32 {
    const MAX: u32 = 12;
    if !value.is_finite() {
        return 0;
    }
    let mut scaled = value.abs();
    for places in 0..MAX {
        if (scaled - scaled.round()).abs() < 1e-9 * scaled.max(1.0) {
            return places;
        }
        scaled *= 10.0;
    }
    MAX
}
