#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use samaritan_location::{LocationFix, LocationValidator, ProximityTarget};
use samaritan_types::{LastKnownLocation, LocationParams, Timestamp};

#[derive(Debug, Arbitrary)]
struct Input {
    lat: f64,
    lng: f64,
    accuracy_m: Option<f64>,
    altitude_m: Option<f64>,
    speed_mps: Option<f64>,
    observed_at: u64,
    now: u64,
    prior: Option<(f64, f64, u64)>,
    target: Option<(f64, f64, f64)>,
}

// Arbitrary coordinates, including NaN and infinities, must never panic the
// validator. An accepted fix has confidence within [0, 1] and is never stamped
// past the default skew allowance.
fuzz_target!(|input: Input| {
    let validator = LocationValidator::new(LocationParams::default());

    let fix = LocationFix {
        lat: input.lat,
        lng: input.lng,
        accuracy_m: input.accuracy_m,
        altitude_m: input.altitude_m,
        speed_mps: input.speed_mps,
        observed_at: Timestamp::from_millis(input.observed_at),
    };
    let prior = input.prior.map(|(lat, lng, at)| LastKnownLocation {
        lat,
        lng,
        observed_at: Timestamp::from_millis(at),
    });
    let target = input
        .target
        .map(|(lat, lng, km)| ProximityTarget::new(lat, lng).within_km(km));

    let now = Timestamp::from_millis(input.now);

    if let Ok(accepted) = validator.evaluate(&fix, prior.as_ref(), target.as_ref(), now) {
        assert!((0.0..=1.0).contains(&accepted.confidence));
        assert!(fix.observed_at.as_millis() <= input.now.saturating_add(30_000));
    }
});
