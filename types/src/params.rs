//! Integrity policy parameters.
//!
//! Every threshold the engine enforces lives here so it can be tuned from
//! configuration without touching code. Defaults match production policy.

use serde::{Deserialize, Serialize};

use crate::Account;

/// All tunable policy values, grouped per component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityParams {
    #[serde(default)]
    pub location: LocationParams,
    #[serde(default)]
    pub device: DeviceParams,
    #[serde(default)]
    pub trust: TrustParams,
    #[serde(default)]
    pub ranking: RankingParams,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationParams {
    /// Physically implausible ground speed for a person on the street.
    pub max_speed_kmh: f64,
    /// A prior fix older than this (relative to server time) is not compared against.
    pub staleness_window_secs: u64,
    /// How far past server time a fix may be stamped before it counts as forged.
    pub max_clock_skew_secs: u64,
    /// Minimum displacement that counts as a teleport...
    pub teleport_distance_km: f64,
    /// ...when covered faster than this.
    pub teleport_window_ms: u64,
    /// Default radius for proximity checks against a target site.
    pub default_proximity_km: f64,
    pub min_altitude_m: f64,
    pub max_altitude_m: f64,
    /// Each accuracy radius (metres) exceeded costs one confidence tier.
    pub accuracy_tiers_m: Vec<f64>,
    /// Coordinates with at most this many decimal places look synthetic.
    pub degenerate_max_decimals: u32,
    /// Confidence lost per accuracy tier and per warning.
    pub confidence_step: f64,
}

impl LocationParams {
    /// Speed ceiling in metres per second, for comparison with device-reported speed.
    pub fn max_speed_mps(&self) -> f64 {
        self.max_speed_kmh / 3.6
    }
}

impl Default for LocationParams {
    fn default() -> Self {
        Self {
            max_speed_kmh: 200.0,
            staleness_window_secs: 300,
            max_clock_skew_secs: 30,
            teleport_distance_km: 1.0,
            teleport_window_ms: 1000,
            default_proximity_km: 0.5,
            min_altitude_m: -500.0,
            max_altitude_m: 9000.0,
            accuracy_tiers_m: vec![20.0, 50.0, 100.0, 500.0],
            degenerate_max_decimals: 3,
            confidence_step: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceParams {
    /// Maximum non-blocked bindings per account.
    pub max_bindings_per_account: u32,
    /// Own bindings at or above this count escalate risk to MEDIUM.
    pub multi_device_warning_at: u32,
    /// Look-back window for shared-IP session matching.
    pub multi_account_window_days: u64,
    /// More distinct accounts than this behind one IP raises a warning.
    pub max_accounts_per_ip: u32,
    /// More IP changes than this within a day raises a warning.
    pub max_ip_changes_per_day: u32,
}

impl Default for DeviceParams {
    fn default() -> Self {
        Self {
            max_bindings_per_account: 2,
            multi_device_warning_at: 3,
            multi_account_window_days: 30,
            max_accounts_per_ip: 3,
            max_ip_changes_per_day: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustParams {
    /// Score given to an account created without an explicit one.
    pub default_score: u8,
    pub successful_help_delta: u8,
    pub positive_rating_delta: u8,
    /// Lowest star rating that counts as positive.
    pub positive_rating_min_stars: u8,
    pub no_show_penalty: u8,
    pub valid_report_penalty: u8,
    /// Strikes at which the account is silently shadow-banned.
    pub strike_limit: u32,
    /// Scores strictly below this make the account invisible.
    pub invisibility_threshold: u8,
}

impl Default for TrustParams {
    fn default() -> Self {
        Self {
            default_score: Account::DEFAULT_SCORE,
            successful_help_delta: 3,
            positive_rating_delta: 2,
            positive_rating_min_stars: 4,
            no_show_penalty: 10,
            valid_report_penalty: 15,
            strike_limit: 3,
            invisibility_threshold: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingParams {
    /// The first K ranks see the requester's contact details.
    pub contact_unlock_threshold: u32,
}

impl Default for RankingParams {
    fn default() -> Self {
        Self {
            contact_unlock_threshold: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_ceiling_in_mps() {
        let p = LocationParams::default();
        assert!((p.max_speed_mps() - 55.5555).abs() < 1e-3);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let p: IntegrityParams =
            serde_json::from_str(r#"{"ranking":{"contact_unlock_threshold":3}}"#).unwrap();
        assert_eq!(p.ranking.contact_unlock_threshold, 3);
        assert_eq!(p.trust, TrustParams::default());
        assert_eq!(p.device.max_bindings_per_account, 2);
    }

    #[test]
    fn default_score_is_configurable() {
        assert_eq!(TrustParams::default().default_score, 50);
        let p: IntegrityParams = serde_json::from_str(r#"{"trust":{"default_score":70}}"#).unwrap();
        assert_eq!(p.trust.default_score, 70);
        assert_eq!(p.trust.strike_limit, 3);
    }
}
