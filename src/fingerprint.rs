//! Content fingerprints used to detect edited presets.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Key shared with the published `cache-presets.json`, whose `sha1` fields
/// were produced with this exact keyed digest.
const FINGERPRINT_KEY: &[u8] = b"chatluna";

/// Hex digest of a preset's raw text. Only ever compared for equality.
pub fn fingerprint(text: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(FINGERPRINT_KEY).expect("HMAC key of any size");
    mac.update(text.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let text = "keywords:\n  - cat\nprompts: []\n";
        assert_eq!(fingerprint(text), fingerprint(text));
    }

    #[test]
    fn test_fingerprint_differs_for_distinct_text() {
        let a = fingerprint("name: 猫娘\nsystem: a");
        let b = fingerprint("name: 猫娘\nsystem: b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_shape() {
        let digest = fingerprint("");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
