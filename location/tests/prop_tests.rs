use proptest::prelude::*;

use samaritan_location::{LocationError, LocationFix, LocationValidator};
use samaritan_types::{LastKnownLocation, LocationParams, Timestamp};

proptest! {
    /// Confidence of any accepted fix stays within [0, 1].
    #[test]
    fn confidence_is_bounded(
        lat in -90.0f64..=90.0,
        lng in -180.0f64..=180.0,
        accuracy in prop::option::of(0.0f64..5000.0),
        altitude in prop::option::of(-2000.0f64..20000.0),
    ) {
        let mut fix = LocationFix::new(lat, lng, Timestamp::from_secs(10));
        fix.accuracy_m = accuracy;
        fix.altitude_m = altitude;
        let out = LocationValidator::default()
            .evaluate(&fix, None, None, fix.observed_at)
            .unwrap();
        prop_assert!((0.0..=1.0).contains(&out.confidence));
    }

    /// Out-of-range latitudes are rejected before anything else is looked at.
    #[test]
    fn invalid_latitude_always_rejected(excess in 0.001f64..500.0, speed in 0.0f64..1000.0) {
        let fix = LocationFix::new(90.0 + excess, 0.0, Timestamp::EPOCH).with_speed(speed);
        let err = LocationValidator::default()
            .evaluate(&fix, None, None, Timestamp::EPOCH)
            .unwrap_err();
        let is_invalid = matches!(err, LocationError::InvalidLocation { .. });
        prop_assert!(is_invalid);
    }

    /// Any accepted consecutive fix implies a speed at or below the ceiling.
    #[test]
    fn accepted_travel_respects_ceiling(
        dlat in -0.5f64..0.5,
        dlng in -0.5f64..0.5,
        elapsed_secs in 1u64..300,
    ) {
        let params = LocationParams::default();
        let prior = LastKnownLocation {
            lat: 10.123_456,
            lng: 20.654_321,
            observed_at: Timestamp::from_secs(1000),
        };
        let fix = LocationFix::new(
            prior.lat + dlat,
            prior.lng + dlng,
            Timestamp::from_secs(1000 + elapsed_secs),
        );
        let validator = LocationValidator::new(params.clone());
        match validator.evaluate(&fix, Some(&prior), None, fix.observed_at) {
            Ok(out) => {
                let speed = out.implied_speed_kmh.unwrap();
                prop_assert!(speed <= params.max_speed_kmh);
            }
            Err(err) => prop_assert!(err.is_fraud_signal()),
        }
    }

    /// Nothing stamped past the skew allowance is accepted, whatever the prior fix.
    #[test]
    fn post_dated_fixes_never_pass(
        ahead_secs in 31u64..10_000_000,
        dlat in -1.0f64..1.0,
        with_prior in any::<bool>(),
    ) {
        let now = Timestamp::from_secs(1_000_000);
        let prior = LastKnownLocation {
            lat: 10.123_456,
            lng: 20.654_321,
            observed_at: Timestamp::from_secs(999_990),
        };
        let fix = LocationFix::new(
            prior.lat + dlat,
            prior.lng,
            now.saturating_add_secs(ahead_secs),
        );
        let prior = with_prior.then_some(&prior);
        let err = LocationValidator::default()
            .evaluate(&fix, prior, None, now)
            .unwrap_err();
        let is_future = matches!(err, LocationError::FutureFix { .. });
        prop_assert!(is_future);
        prop_assert!(err.is_fraud_signal());
    }
}
