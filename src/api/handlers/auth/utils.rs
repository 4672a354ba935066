//! Small helpers shared by the session/token lifecycle modules.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Prefix on every refresh secret so leaked values are recognizable in scans.
pub(super) const REFRESH_SECRET_PREFIX: &str = "cst_";

const REFRESH_SECRET_BYTES: usize = 32;

/// Create a new opaque refresh secret.
///
/// The raw value is returned to the client exactly once; the database only
/// ever sees its hash.
pub(crate) fn generate_refresh_secret() -> Result<String> {
    let mut bytes = [0u8; REFRESH_SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate refresh secret")?;
    Ok(format!(
        "{REFRESH_SECRET_PREFIX}{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    ))
}

/// Hash a refresh secret so raw values never touch the database.
/// The hash is used for lookups when the cookie is presented.
pub(crate) fn hash_refresh_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Extract a client IP for throttling from common proxy headers.
pub(super) fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn generate_refresh_secret_is_prefixed_and_random() -> anyhow::Result<()> {
        let first = generate_refresh_secret()?;
        let second = generate_refresh_secret()?;
        assert!(first.starts_with(REFRESH_SECRET_PREFIX));
        assert_ne!(first, second);

        let decoded = URL_SAFE_NO_PAD
            .decode(first.trim_start_matches(REFRESH_SECRET_PREFIX).as_bytes())
            .context("decode refresh secret")?;
        assert_eq!(decoded.len(), REFRESH_SECRET_BYTES);
        Ok(())
    }

    #[test]
    fn hash_refresh_secret_stable() {
        let first = hash_refresh_secret("secret");
        let second = hash_refresh_secret("secret");
        let different = hash_refresh_secret("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn extract_client_ip_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 172.16.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.0.9"));
        assert_eq!(extract_client_ip(&headers), Some("10.0.0.1".to_string()));
    }

    #[test]
    fn extract_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.0.9"));
        assert_eq!(extract_client_ip(&headers), Some("192.168.0.9".to_string()));
    }

    #[test]
    fn extract_client_ip_none_when_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers), None);
    }

    #[test]
    fn is_unique_violation_ignores_other_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
