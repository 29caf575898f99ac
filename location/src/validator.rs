//! Pure decision core of the location validator.

use serde::{Deserialize, Serialize};

use samaritan_geo::{decimal_places, distance_km, implied_speed_kmh, is_valid_coordinate};
use samaritan_types::{LastKnownLocation, LocationParams, Timestamp};

use crate::{LocationError, LocationFix, ProximityTarget};

/// A heuristic that looked suspicious but does not reject on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SpoofWarning {
    /// Real receivers never report a perfect fix.
    ZeroAccuracy,
    /// Both coordinates carry too few decimals, typical of hand-typed values.
    DegenerateCoordinates,
    AltitudeOutOfRange { altitude_m: f64 },
    /// Movement since the prior fix is fast but still below the ceiling.
    HighImpliedSpeed { speed_kmh: f64 },
}

/// An accepted fix with everything the validator measured along the way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcceptedFix {
    /// Trust in this fix, in `[0, 1]`.
    pub confidence: f64,
    pub warnings: Vec<SpoofWarning>,
    /// Accuracy tiers exceeded by the reported accuracy radius.
    pub accuracy_tiers: u32,
    pub distance_from_prior_km: Option<f64>,
    pub implied_speed_kmh: Option<f64>,
    pub distance_to_target_km: Option<f64>,
}

/// Runs the ordered location checks against configured policy.
#[derive(Clone, Debug, Default)]
pub struct LocationValidator {
    params: LocationParams,
}

impl LocationValidator {
    pub fn new(params: LocationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LocationParams {
        &self.params
    }

    /// Evaluate `fix` against the account's `prior` fix and an optional `target`
    /// at server time `now`.
    ///
    /// Never mutates anything; the caller persists the fix on `Ok` and applies
    /// fraud side effects when [`LocationError::is_fraud_signal`] holds.
    pub fn evaluate(
        &self,
        fix: &LocationFix,
        prior: Option<&LastKnownLocation>,
        target: Option<&ProximityTarget>,
        now: Timestamp,
    ) -> Result<AcceptedFix, LocationError> {
        if !is_valid_coordinate(fix.lat, fix.lng) {
            return Err(LocationError::InvalidLocation {
                lat: fix.lat,
                lng: fix.lng,
            });
        }

        // Post-dated fixes would dodge the travel checks and pin the stored fix ahead of time.
        let ahead_ms = now.elapsed_since(fix.observed_at);
        if ahead_ms > self.params.max_clock_skew_secs.saturating_mul(1000) {
            return Err(LocationError::FutureFix {
                observed_at: fix.observed_at,
                now,
                ahead_ms,
            });
        }

        let mut warnings = self.spoof_warnings(fix)?;

        let mut distance_from_prior_km = None;
        let mut implied_speed = None;
        if let Some(prior) = prior {
            if fix.observed_at < prior.observed_at {
                return Err(LocationError::StaleFix {
                    observed_at: fix.observed_at,
                    stored_at: prior.observed_at,
                });
            }
            let prior_age_ms = prior.observed_at.elapsed_since(now);
            if prior_age_ms <= self.params.staleness_window_secs.saturating_mul(1000) {
                let elapsed_ms = prior.observed_at.elapsed_since(fix.observed_at);
                let moved = distance_km(prior.lat, prior.lng, fix.lat, fix.lng).map_err(|_| {
                    LocationError::InvalidLocation {
                        lat: prior.lat,
                        lng: prior.lng,
                    }
                })?;
                distance_from_prior_km = Some(moved);
                implied_speed = self.check_travel(moved, elapsed_ms, &mut warnings)?;
            }
        }

        let distance_to_target_km = match target {
            Some(target) => Some(self.check_proximity(fix, target)?),
            None => None,
        };

        let accuracy_tiers = self.accuracy_tiers(fix);
        let confidence = self.confidence(accuracy_tiers, warnings.len());

        Ok(AcceptedFix {
            confidence,
            warnings,
            accuracy_tiers,
            distance_from_prior_km,
            implied_speed_kmh: implied_speed,
            distance_to_target_km,
        })
    }

    fn spoof_warnings(&self, fix: &LocationFix) -> Result<Vec<SpoofWarning>, LocationError> {
        let mut warnings = Vec::new();

        if fix.accuracy() == Some(0.0) {
            warnings.push(SpoofWarning::ZeroAccuracy);
        }

        let max_decimals = self.params.degenerate_max_decimals;
        if decimal_places(fix.lat) <= max_decimals && decimal_places(fix.lng) <= max_decimals {
            warnings.push(SpoofWarning::DegenerateCoordinates);
        }

        if let Some(altitude_m) = fix.altitude() {
            if altitude_m < self.params.min_altitude_m || altitude_m > self.params.max_altitude_m {
                warnings.push(SpoofWarning::AltitudeOutOfRange { altitude_m });
            }
        }

        if let Some(mps) = fix.speed() {
            if mps > self.params.max_speed_mps() {
                return Err(LocationError::ImpossibleSpeed {
                    speed_kmh: mps * 3.6,
                });
            }
        }

        Ok(warnings)
    }

    /// Returns the implied speed when one could be computed.
    fn check_travel(
        &self,
        moved_km: f64,
        elapsed_ms: u64,
        warnings: &mut Vec<SpoofWarning>,
    ) -> Result<Option<f64>, LocationError> {
        if moved_km > self.params.teleport_distance_km && elapsed_ms < self.params.teleport_window_ms
        {
            return Err(LocationError::TeleportDetected {
                distance_km: moved_km,
                elapsed_ms,
            });
        }

        let Some(speed_kmh) = implied_speed_kmh(moved_km, elapsed_ms) else {
            return Ok(None);
        };

        if speed_kmh > self.params.max_speed_kmh {
            return Err(LocationError::ImpossibleTravel {
                speed_kmh,
                distance_km: moved_km,
                elapsed_ms,
            });
        }
        if speed_kmh > self.params.max_speed_kmh / 2.0 {
            warnings.push(SpoofWarning::HighImpliedSpeed { speed_kmh });
        }
        Ok(Some(speed_kmh))
    }

    fn check_proximity(
        &self,
        fix: &LocationFix,
        target: &ProximityTarget,
    ) -> Result<f64, LocationError> {
        let max_km = target
            .max_distance_km
            .unwrap_or(self.params.default_proximity_km);
        let distance = distance_km(fix.lat, fix.lng, target.lat, target.lng).map_err(|_| {
            LocationError::InvalidLocation {
                lat: target.lat,
                lng: target.lng,
            }
        })?;
        if distance > max_km {
            return Err(LocationError::TooFarFromTarget {
                distance_km: distance,
                max_km,
            });
        }
        Ok(distance)
    }

    fn accuracy_tiers(&self, fix: &LocationFix) -> u32 {
        match fix.accuracy() {
            Some(radius) => self
                .params
                .accuracy_tiers_m
                .iter()
                .filter(|tier| radius > **tier)
                .count() as u32,
            None => 0,
        }
    }

    fn confidence(&self, tiers: u32, warnings: usize) -> f64 {
        let deductions = (tiers as f64 + warnings as f64) * self.params.confidence_step;
        (1.0 - deductions).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Coordinates with plenty of decimals so the degenerate heuristic stays quiet.
    const LAT: f64 = -33.868_812;
    const LNG: f64 = 151.209_343;

    fn validator() -> LocationValidator {
        LocationValidator::default()
    }

    fn fix_at(lat: f64, lng: f64, secs: u64) -> LocationFix {
        LocationFix::new(lat, lng, Timestamp::from_secs(secs))
    }

    fn prior(lat: f64, lng: f64, secs: u64) -> LastKnownLocation {
        LastKnownLocation {
            lat,
            lng,
            observed_at: Timestamp::from_secs(secs),
        }
    }

    #[test]
    fn first_fix_is_accepted_with_full_confidence() {
        let out = validator()
            .evaluate(&fix_at(LAT, LNG, 100), None, None, Timestamp::from_secs(100))
            .unwrap();
        assert_eq!(out.confidence, 1.0);
        assert!(out.warnings.is_empty());
        assert!(out.distance_from_prior_km.is_none());
    }

    #[test]
    fn invalid_coordinate_rejected() {
        let err = validator()
            .evaluate(&fix_at(95.0, LNG, 100), None, None, Timestamp::from_secs(100))
            .unwrap_err();
        assert!(matches!(err, LocationError::InvalidLocation { .. }));
        assert!(!err.is_fraud_signal());
    }

    #[test]
    fn zero_accuracy_warns_and_costs_confidence() {
        let fix = fix_at(LAT, LNG, 100).with_accuracy(0.0);
        let out = validator().evaluate(&fix, None, None, fix.observed_at).unwrap();
        assert_eq!(out.warnings, vec![SpoofWarning::ZeroAccuracy]);
        assert!((out.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn round_coordinates_are_degenerate() {
        let out = validator()
            .evaluate(&fix_at(40.0, -74.5, 100), None, None, Timestamp::from_secs(100))
            .unwrap();
        assert_eq!(out.warnings, vec![SpoofWarning::DegenerateCoordinates]);
    }

    #[test]
    fn altitude_out_of_range_warns() {
        let fix = fix_at(LAT, LNG, 100).with_altitude(12_000.0);
        let out = validator().evaluate(&fix, None, None, fix.observed_at).unwrap();
        assert!(matches!(
            out.warnings.as_slice(),
            [SpoofWarning::AltitudeOutOfRange { .. }]
        ));
    }

    #[test]
    fn reported_speed_over_ceiling_rejects() {
        let fix = fix_at(LAT, LNG, 100).with_speed(60.0);
        let err = validator().evaluate(&fix, None, None, fix.observed_at).unwrap_err();
        assert!(matches!(err, LocationError::ImpossibleSpeed { speed_kmh } if (speed_kmh - 216.0).abs() < 1e-9));
        assert!(err.is_fraud_signal());
    }

    #[test]
    fn reported_speed_under_ceiling_is_fine() {
        let fix = fix_at(LAT, LNG, 100).with_speed(50.0);
        assert!(validator().evaluate(&fix, None, None, fix.observed_at).is_ok());
    }

    #[test]
    fn teleport_detected_within_one_second() {
        let p = prior(LAT, LNG, 0);
        let mut fix = fix_at(LAT + 0.05, LNG, 0);
        fix.observed_at = Timestamp::from_millis(500);
        let err = validator().evaluate(&fix, Some(&p), None, fix.observed_at).unwrap_err();
        assert!(matches!(err, LocationError::TeleportDetected { elapsed_ms: 500, .. }));
    }

    #[test]
    fn impossible_travel_reports_speed() {
        // ~11 km in 60 s ≈ 667 km/h.
        let p = prior(LAT, LNG, 1000);
        let fix = fix_at(LAT + 0.1, LNG, 1060);
        let err = validator().evaluate(&fix, Some(&p), None, fix.observed_at).unwrap_err();
        match err {
            LocationError::ImpossibleTravel { speed_kmh, .. } => {
                assert!(speed_kmh > 600.0 && speed_kmh < 700.0, "{speed_kmh}")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fast_but_possible_travel_warns() {
        // ~1.11 km in 30 s ≈ 133 km/h: above half the ceiling, below the ceiling.
        let p = prior(LAT, LNG, 1000);
        let fix = fix_at(LAT + 0.01, LNG, 1030);
        let out = validator().evaluate(&fix, Some(&p), None, fix.observed_at).unwrap();
        assert!(matches!(
            out.warnings.as_slice(),
            [SpoofWarning::HighImpliedSpeed { .. }]
        ));
        assert!((out.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn stale_prior_is_ignored() {
        // Same jump as the impossible-travel case but the prior fix is 10 minutes old.
        let p = prior(LAT, LNG, 1000);
        let fix = fix_at(LAT + 0.1, LNG, 1600);
        let out = validator().evaluate(&fix, Some(&p), None, fix.observed_at).unwrap();
        assert!(out.distance_from_prior_km.is_none());
    }

    #[test]
    fn post_dated_fix_is_fraud() {
        // Ten minutes ahead of the server: would otherwise skip the travel checks.
        let p = prior(LAT, LNG, 1000);
        let fix = fix_at(LAT + 30.0, LNG, 1610);
        let err = validator()
            .evaluate(&fix, Some(&p), None, Timestamp::from_secs(1010))
            .unwrap_err();
        assert!(matches!(err, LocationError::FutureFix { ahead_ms: 600_000, .. }));
        assert!(err.is_fraud_signal());
    }

    #[test]
    fn small_clock_skew_is_tolerated() {
        let fix = fix_at(LAT, LNG, 130);
        assert!(validator()
            .evaluate(&fix, None, None, Timestamp::from_secs(100))
            .is_ok());

        let fix = fix_at(LAT, LNG, 131);
        let err = validator()
            .evaluate(&fix, None, None, Timestamp::from_secs(100))
            .unwrap_err();
        assert_eq!(err.kind(), "future_fix");
    }

    #[test]
    fn staleness_is_measured_against_server_time() {
        // Prior fix is fresh by server time, so a fix stamped within skew is still compared.
        let p = prior(LAT, LNG, 1000);
        let fix = fix_at(LAT + 0.1, LNG, 1030);
        let err = validator()
            .evaluate(&fix, Some(&p), None, Timestamp::from_secs(1010))
            .unwrap_err();
        assert!(matches!(err, LocationError::ImpossibleTravel { .. }));

        // Same pair once the prior has aged past the window on the server clock.
        let out = validator()
            .evaluate(&fix, Some(&p), None, Timestamp::from_secs(1400))
            .unwrap();
        assert!(out.distance_from_prior_km.is_none());
    }

    #[test]
    fn out_of_order_fix_rejected() {
        let p = prior(LAT, LNG, 1000);
        let fix = fix_at(LAT, LNG, 999);
        let err = validator().evaluate(&fix, Some(&p), None, fix.observed_at).unwrap_err();
        assert!(matches!(err, LocationError::StaleFix { .. }));
    }

    #[test]
    fn proximity_uses_default_radius() {
        let target = ProximityTarget::new(LAT + 0.01, LNG);
        let err = validator()
            .evaluate(&fix_at(LAT, LNG, 100), None, Some(&target), Timestamp::from_secs(100))
            .unwrap_err();
        assert!(matches!(err, LocationError::TooFarFromTarget { max_km, .. } if max_km == 0.5));

        let wide = target.within_km(2.0);
        let out = validator()
            .evaluate(&fix_at(LAT, LNG, 100), None, Some(&wide), Timestamp::from_secs(100))
            .unwrap();
        assert!(out.distance_to_target_km.unwrap() > 1.0);
    }

    #[test]
    fn confidence_deducts_accuracy_tiers_and_floors_at_zero() {
        let fix = fix_at(LAT, LNG, 100).with_accuracy(60.0);
        let out = validator().evaluate(&fix, None, None, fix.observed_at).unwrap();
        assert_eq!(out.accuracy_tiers, 2);
        assert!((out.confidence - 0.8).abs() < 1e-9);

        let params = LocationParams {
            confidence_step: 0.5,
            ..LocationParams::default()
        };
        let fix = fix_at(40.0, 10.0, 100).with_accuracy(1000.0);
        let out = LocationValidator::new(params)
            .evaluate(&fix, None, None, fix.observed_at)
            .unwrap();
        assert_eq!(out.confidence, 0.0);
    }
}
