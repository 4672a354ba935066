//! Device fingerprint canonicalization and hashing.
//!
//! The fingerprint is a soft binding: a browser or OS update legitimately
//! changes the hash and invalidates the session. It is a risk signal, not a
//! trust boundary; throttling and credential checks remain primary.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Bytes of the hash shown in logs and quick comparisons.
const SHORT_HASH_BYTES: usize = 4;

/// Client-supplied device characteristics. Only ever persisted as a hash.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceFingerprint {
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_depth: u32,
    pub timezone: String,
    pub language: String,
    pub user_agent: String,
    pub canvas_signature: String,
    pub webgl_signature: String,
    pub touch_support: bool,
    pub hardware_concurrency: u32,
    pub device_memory: Option<f64>,
    pub platform: String,
}

impl DeviceFingerprint {
    /// Deterministic canonical form: every field, fixed order, `|`-joined.
    fn canonical(&self) -> String {
        let device_memory = self
            .device_memory
            .map_or_else(|| "unknown".to_string(), |memory| memory.to_string());
        [
            self.screen_width.to_string(),
            self.screen_height.to_string(),
            self.color_depth.to_string(),
            self.timezone.clone(),
            self.language.clone(),
            self.user_agent.clone(),
            self.canvas_signature.clone(),
            self.webgl_signature.clone(),
            self.touch_support.to_string(),
            self.hardware_concurrency.to_string(),
            device_memory,
            self.platform.clone(),
        ]
        .join("|")
    }

    /// SHA-256 over the canonical form; this is what gets persisted.
    #[must_use]
    pub fn hash(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        hasher.finalize().to_vec()
    }

    /// Truncated hex prefix for logs and events.
    #[must_use]
    pub fn short_hash(&self) -> String {
        short_hash_of(&self.hash())
    }

    /// Recompute and compare against a stored hash.
    #[must_use]
    pub fn matches(&self, stored_hash: &[u8]) -> bool {
        self.hash() == stored_hash
    }
}

/// Hex prefix of an already-computed fingerprint hash.
pub(super) fn short_hash_of(hash: &[u8]) -> String {
    hex::encode(&hash[..hash.len().min(SHORT_HASH_BYTES)])
}

#[cfg(test)]
pub(crate) fn test_fingerprint() -> DeviceFingerprint {
    DeviceFingerprint {
        screen_width: 1920,
        screen_height: 1080,
        color_depth: 24,
        timezone: "Europe/Madrid".to_string(),
        language: "en-US".to_string(),
        user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
        canvas_signature: "c4nv4s".to_string(),
        webgl_signature: "w3bgl".to_string(),
        touch_support: false,
        hardware_concurrency: 8,
        device_memory: Some(8.0),
        platform: "Linux x86_64".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let fingerprint = test_fingerprint();
        assert_eq!(fingerprint.hash(), fingerprint.hash());
        assert_eq!(fingerprint.hash().len(), 32);
    }

    #[test]
    fn matches_own_hash() {
        let fingerprint = test_fingerprint();
        let stored = fingerprint.hash();
        assert!(fingerprint.matches(&stored));
    }

    #[test]
    fn every_field_affects_the_hash() {
        let base = test_fingerprint();
        let stored = base.hash();

        let variants = [
            DeviceFingerprint {
                screen_width: 1280,
                ..base.clone()
            },
            DeviceFingerprint {
                screen_height: 720,
                ..base.clone()
            },
            DeviceFingerprint {
                color_depth: 30,
                ..base.clone()
            },
            DeviceFingerprint {
                timezone: "UTC".to_string(),
                ..base.clone()
            },
            DeviceFingerprint {
                language: "de-DE".to_string(),
                ..base.clone()
            },
            DeviceFingerprint {
                user_agent: "other".to_string(),
                ..base.clone()
            },
            DeviceFingerprint {
                canvas_signature: "other".to_string(),
                ..base.clone()
            },
            DeviceFingerprint {
                webgl_signature: "other".to_string(),
                ..base.clone()
            },
            DeviceFingerprint {
                touch_support: true,
                ..base.clone()
            },
            DeviceFingerprint {
                hardware_concurrency: 4,
                ..base.clone()
            },
            DeviceFingerprint {
                device_memory: None,
                ..base.clone()
            },
            DeviceFingerprint {
                platform: "Win32".to_string(),
                ..base.clone()
            },
        ];

        for variant in variants {
            assert!(!variant.matches(&stored), "field change went undetected");
        }
    }

    #[test]
    fn field_order_cannot_collide_via_joined_values() {
        // Swapping adjacent numeric fields must change the canonical form.
        let base = test_fingerprint();
        let swapped = DeviceFingerprint {
            screen_width: base.screen_height,
            screen_height: base.screen_width,
            ..base.clone()
        };
        assert_ne!(base.hash(), swapped.hash());
    }

    #[test]
    fn short_hash_is_hex_prefix() {
        let fingerprint = test_fingerprint();
        let short = fingerprint.short_hash();
        assert_eq!(short.len(), 8);
        assert_eq!(short, hex::encode(&fingerprint.hash()[..4]));
    }
}
