//! Device fingerprint derivation.
//!
//! Stable browser-exposed attributes are joined with a fixed delimiter,
//! SHA-256 hashed, and the first 16 bytes hex-encoded. Same attributes, same
//! fingerprint; no storage or network access.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use samaritan_types::Fingerprint;

/// Separator between attributes in the hashed preimage.
pub const DELIMITER: &str = "|||";

/// Bytes of the digest kept in the fingerprint (hex-encoded to twice as many chars).
const FINGERPRINT_BYTES: usize = Fingerprint::LEN / 2;

/// Client-reported device attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    pub user_agent: String,
    /// e.g. `"1920x1080"`.
    pub screen: String,
    pub timezone: String,
    pub language: String,
    pub platform: String,
    pub color_depth: u32,
    pub pixel_ratio: f64,
    pub touch_support: bool,
    #[serde(default)]
    pub device_memory_gb: Option<f64>,
    #[serde(default)]
    pub hardware_concurrency: Option<u32>,
}

impl DeviceAttributes {
    /// The canonical preimage: every attribute in fixed order, absent ones as `unknown`.
    pub fn canonical(&self) -> String {
        let memory = self
            .device_memory_gb
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let cores = self
            .hardware_concurrency
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        [
            self.user_agent.clone(),
            self.screen.clone(),
            self.timezone.clone(),
            self.language.clone(),
            self.platform.clone(),
            self.color_depth.to_string(),
            self.pixel_ratio.to_string(),
            self.touch_support.to_string(),
            memory,
            cores,
        ]
        .join(DELIMITER)
    }
}

/// Derive the fingerprint for a set of device attributes.
pub fn compute_fingerprint(attrs: &DeviceAttributes) -> Fingerprint {
    let digest = Sha256::digest(attrs.canonical().as_bytes());
    let encoded = hex::encode(&digest[..FINGERPRINT_BYTES]);
    Fingerprint::parse(&encoded).expect("hex-encoded digest prefix is a valid fingerprint")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeviceAttributes {
        DeviceAttributes {
            user_agent: "Mozilla/5.0 (Linux; Android 14) Chrome/126.0".into(),
            screen: "412x915".into(),
            timezone: "Asia/Kolkata".into(),
            language: "en-IN".into(),
            platform: "Linux armv8l".into(),
            color_depth: 24,
            pixel_ratio: 2.625,
            touch_support: true,
            device_memory_gb: Some(8.0),
            hardware_concurrency: Some(8),
        }
    }

    #[test]
    fn deterministic() {
        assert_eq!(compute_fingerprint(&sample()), compute_fingerprint(&sample()));
    }

    #[test]
    fn fixed_length_lowercase_hex() {
        let fp = compute_fingerprint(&sample());
        assert_eq!(fp.as_str().len(), Fingerprint::LEN);
        assert!(fp
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn any_attribute_change_changes_fingerprint() {
        let base = compute_fingerprint(&sample());
        let mut other = sample();
        other.timezone = "Europe/Berlin".into();
        assert_ne!(base, compute_fingerprint(&other));

        let mut other = sample();
        other.hardware_concurrency = None;
        assert_ne!(base, compute_fingerprint(&other));
    }

    #[test]
    fn matches_sha256_prefix_of_canonical_form() {
        let attrs = sample();
        let full = hex::encode(Sha256::digest(attrs.canonical().as_bytes()));
        assert_eq!(compute_fingerprint(&attrs).as_str(), &full[..Fingerprint::LEN]);
    }

    #[test]
    fn canonical_uses_fixed_delimiter() {
        let canonical = DeviceAttributes::default().canonical();
        assert_eq!(canonical.matches(DELIMITER).count(), 9);
        assert!(canonical.ends_with("unknown|||unknown"));
    }
}
