//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use samaritan_types::{Account, IntegrityParams};
use samaritan_utils::LogFormat;

use crate::EngineError;

/// Which storage backend the engine runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Everything in process memory; lost on exit.
    #[default]
    Memory,
    /// LMDB environment under `data_dir`.
    Lmdb,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB memory map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,
}

/// Configuration for an [`IntegrityEngine`](crate::IntegrityEngine).
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log output format ("human" or "json").
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log filter directive (e.g. "info", "debug,samaritan_engine=trace").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound on engine operations running at once.
    #[serde(default = "default_max_concurrent_ops")]
    pub max_concurrent_ops: usize,

    /// Audit entries held for retry while the sink is down. The oldest is
    /// evicted once the queue is full.
    #[serde(default = "default_max_pending_audits")]
    pub max_pending_audits: usize,

    /// Policy thresholds and deltas.
    #[serde(default)]
    pub params: IntegrityParams,

    #[serde(default)]
    pub storage: StorageConfig,
}

// ── Defaults ───────────────────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./samaritan-data")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrent_ops() -> usize {
    64
}

fn default_max_pending_audits() -> usize {
    10_000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: &str| Err(EngineError::Config(msg.to_string()));
        let location = &self.params.location;

        if self.max_concurrent_ops == 0 {
            return invalid("max_concurrent_ops must be at least 1");
        }
        if self.max_pending_audits == 0 {
            return invalid("max_pending_audits must be at least 1");
        }
        if self.storage.map_size == 0 {
            return invalid("storage.map_size must be positive");
        }
        if !(location.max_speed_kmh.is_finite() && location.max_speed_kmh > 0.0) {
            return invalid("params.location.max_speed_kmh must be a positive number");
        }
        if location.min_altitude_m >= location.max_altitude_m {
            return invalid("params.location.min_altitude_m must be below max_altitude_m");
        }
        if !location.accuracy_tiers_m.windows(2).all(|w| w[0] < w[1]) {
            return invalid("params.location.accuracy_tiers_m must be strictly increasing");
        }
        if !(0.0..=1.0).contains(&location.confidence_step) {
            return invalid("params.location.confidence_step must be within 0..=1");
        }
        if self.params.device.max_bindings_per_account == 0 {
            return invalid("params.device.max_bindings_per_account must be at least 1");
        }
        if self.params.trust.strike_limit == 0 {
            return invalid("params.trust.strike_limit must be at least 1");
        }
        if self.params.trust.default_score > Account::MAX_SCORE {
            return invalid("params.trust.default_score must be within 0..=100");
        }
        if self.params.trust.invisibility_threshold > 100 {
            return invalid("params.trust.invisibility_threshold must be within 0..=100");
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            map_size: default_map_size(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            max_concurrent_ops: default_max_concurrent_ops(),
            max_pending_audits: default_max_pending_audits(),
            params: IntegrityParams::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let toml_str = config.to_toml_string().expect("should serialize");
        let parsed = EngineConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.max_concurrent_ops, 64);
        assert_eq!(config.max_pending_audits, 10_000);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.params.location.max_speed_kmh, 200.0);
        assert_eq!(config.params.ranking.contact_unlock_threshold, 5);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            log_format = "json"

            [params.trust]
            strike_limit = 5

            [params.ranking]
            contact_unlock_threshold = 3

            [storage]
            backend = "lmdb"
            data_dir = "/var/lib/samaritan"
        "#;
        let config = EngineConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.params.trust.strike_limit, 5);
        assert_eq!(config.params.trust.no_show_penalty, 10);
        assert_eq!(config.params.ranking.contact_unlock_threshold, 3);
        assert_eq!(config.storage.backend, StorageBackend::Lmdb);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/samaritan"));
        assert_eq!(config.storage.map_size, 1 << 30);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_toml_str("max_concurrent_ops = 0").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err = EngineConfig::from_toml_str("[params.location]\naccuracy_tiers_m = [50.0, 20.0]")
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err = EngineConfig::from_toml_str("[params.trust]\ndefault_score = 101").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = EngineConfig::from_toml_file("/nonexistent/samaritan.toml");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
