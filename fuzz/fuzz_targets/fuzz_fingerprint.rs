#![no_main]

use libfuzzer_sys::fuzz_target;

use samaritan_device::{compute_fingerprint, DeviceAttributes};
use samaritan_types::Fingerprint;

// Any attribute payload that parses yields a well-formed fingerprint, and the
// fingerprint parser never panics on arbitrary text.
fuzz_target!(|data: &[u8]| {
    if let Ok(attrs) = serde_json::from_slice::<DeviceAttributes>(data) {
        let fp = compute_fingerprint(&attrs);
        assert_eq!(fp.as_str().len(), Fingerprint::LEN);
        assert_eq!(fp, compute_fingerprint(&attrs));
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Fingerprint::parse(text);
    }
});
