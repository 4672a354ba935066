//! Refresh token delivery as a browser cookie.

use axum::http::{HeaderMap, HeaderValue, header::InvalidHeaderValue};

use super::state::{AuthConfig, Environment};

pub(super) const REFRESH_COOKIE_NAME: &str = "custos_refresh";

/// Build the `Set-Cookie` value carrying a fresh refresh secret.
///
/// `HttpOnly` always; `Secure` outside development; `SameSite=Strict` in
/// production and `Lax` in development so local cross-port frontends work.
pub(super) fn refresh_cookie(
    config: &AuthConfig,
    secret: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let same_site = same_site(config.environment());
    let mut cookie = format!(
        "{REFRESH_COOKIE_NAME}={secret}; Path=/; HttpOnly; SameSite={same_site}; Max-Age={max_age_seconds}"
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Expire the refresh cookie with the same attributes it was set with.
pub(super) fn clear_refresh_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let same_site = same_site(config.environment());
    let mut cookie =
        format!("{REFRESH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite={same_site}; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

const fn same_site(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "Strict",
        Environment::Development => "Lax",
    }
}

/// Pull the refresh secret out of the request's `Cookie` header.
pub(super) fn extract_refresh_secret(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == REFRESH_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}
