//! Access/refresh token pair issuance and per-user cap eviction.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::error::AuthError;
use super::events::AuthEvent;
use super::fingerprint::DeviceFingerprint;
use super::jwt::AccessTokenClaims;
use super::state::AuthState;
use super::storage;

const SETTINGS_SECTION: &str = "tokens";

/// Security-relevant lifetimes; every key must be present in the settings
/// provider. There are deliberately no defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct TokenPolicy {
    pub(super) access_token_ttl_minutes: i64,
    pub(super) refresh_token_ttl_days: i64,
    pub(super) refresh_before_expiry_seconds: i64,
    pub(super) max_tokens_per_user: i64,
}

pub(super) async fn load_token_policy(pool: &PgPool) -> Result<TokenPolicy, AuthError> {
    Ok(TokenPolicy {
        access_token_ttl_minutes: required_setting(pool, "access_token_ttl_minutes").await?,
        refresh_token_ttl_days: required_setting(pool, "refresh_token_ttl_days").await?,
        refresh_before_expiry_seconds: required_setting(pool, "refresh_before_expiry_seconds")
            .await?,
        max_tokens_per_user: required_setting(pool, "max_tokens_per_user").await?,
    })
}

pub(super) async fn required_setting(pool: &PgPool, key: &str) -> Result<i64, AuthError> {
    let value = storage::get_setting(pool, SETTINGS_SECTION, key)
        .await
        .map_err(AuthError::Storage)?
        .ok_or_else(|| {
            AuthError::Configuration(format!("missing required setting {SETTINGS_SECTION}.{key}"))
        })?;
    let parsed: i64 = value.trim().parse().map_err(|_| {
        AuthError::Configuration(format!(
            "setting {SETTINGS_SECTION}.{key} is not an integer: {value}"
        ))
    })?;
    if parsed <= 0 {
        return Err(AuthError::Configuration(format!(
            "setting {SETTINGS_SECTION}.{key} must be positive: {parsed}"
        )));
    }
    Ok(parsed)
}

/// A freshly issued pair. The refresh secret is plaintext exactly once,
/// here; only its hash survives in storage.
pub(super) struct TokenPair {
    pub(super) access_token: String,
    pub(super) refresh_token: String,
    pub(super) access_expires_at: DateTime<Utc>,
    pub(super) refresh_expires_at: DateTime<Utc>,
    pub(super) expires_in_seconds: i64,
}

/// Issue a new access/refresh pair for the user.
///
/// Evicts the oldest active tokens first when the user is at the cap,
/// leaving exactly one free slot. Any storage failure aborts before a pair
/// is returned; a generated-but-unpersisted token is never observable.
pub(super) async fn issue(
    pool: &PgPool,
    state: &AuthState,
    username: &str,
    user_id: Uuid,
    fingerprint: Option<&DeviceFingerprint>,
    events: &mut Vec<AuthEvent>,
) -> Result<TokenPair, AuthError> {
    let policy = load_token_policy(pool).await?;

    let active = storage::count_active_tokens(pool, user_id)
        .await
        .map_err(AuthError::Storage)?;
    if active >= policy.max_tokens_per_user {
        let overflow = active - (policy.max_tokens_per_user - 1);
        let revoked = storage::evict_oldest_tokens(pool, user_id, overflow)
            .await
            .map_err(AuthError::Storage)?;
        events.push(AuthEvent::TokensEvicted { user_id, revoked });
    }

    let now = Utc::now();
    let access_expires_at = now + Duration::minutes(policy.access_token_ttl_minutes);
    let refresh_expires_at = now + Duration::days(policy.refresh_token_ttl_days);

    let jti = Uuid::new_v4().to_string();
    let claims = AccessTokenClaims {
        iss: state.config().token_issuer().to_string(),
        sub: username.to_string(),
        aud: state.config().token_audience().to_string(),
        jti: jti.clone(),
        uid: user_id,
        iat: now.timestamp(),
        exp: access_expires_at.timestamp(),
    };
    let access_token = state
        .signer()
        .sign(&claims)
        .map_err(|err| AuthError::Configuration(format!("failed to sign access token: {err}")))?;

    let fingerprint_hash = fingerprint.map(DeviceFingerprint::hash);
    let refresh_token = storage::insert_refresh_token(
        pool,
        user_id,
        refresh_expires_at,
        fingerprint_hash.as_deref(),
    )
    .await
    .map_err(AuthError::Storage)?;

    events.push(AuthEvent::TokenIssued {
        user_id,
        jti,
        fingerprint: fingerprint.map(DeviceFingerprint::short_hash),
    });

    Ok(TokenPair {
        access_token,
        refresh_token,
        access_expires_at,
        refresh_expires_at,
        expires_in_seconds: policy.access_token_ttl_minutes * 60,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Policy loading against a live database is exercised in the module
    // integration tests; here we pin the arithmetic the issuer relies on.

    #[test]
    fn overflow_leaves_one_free_slot() {
        let max = 3;
        for active in [3_i64, 4, 7] {
            let overflow = active - (max - 1);
            assert_eq!(active - overflow, max - 1, "one slot must remain free");
        }
    }

    #[test]
    fn expires_in_matches_access_ttl() {
        let policy = TokenPolicy {
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            refresh_before_expiry_seconds: 300,
            max_tokens_per_user: 5,
        };
        assert_eq!(policy.access_token_ttl_minutes * 60, 900);
        assert!(policy.refresh_before_expiry_seconds < policy.access_token_ttl_minutes * 60);
    }
}
