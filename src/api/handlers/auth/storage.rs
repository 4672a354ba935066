//! Database access for identity reads, refresh token lifecycle, and policy.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::error::TokenFailure;
use super::utils::{generate_refresh_secret, hash_refresh_secret, is_unique_violation};

/// Identity-store row needed to validate credentials. Read-only.
pub(super) struct UserRecord {
    pub(super) user_id: Uuid,
    pub(super) password_hash: String,
    pub(super) status: String,
}

/// Row returned when a refresh token is atomically claimed for rotation.
pub(super) struct ClaimedToken {
    pub(super) id: Uuid,
    pub(super) user_id: Uuid,
}

pub(super) async fn find_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRecord>> {
    let query =
        "SELECT id, password_hash, status::text AS status FROM users WHERE username = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by username")?;

    Ok(row.map(|row| UserRecord {
        user_id: row.get("id"),
        password_hash: row.get("password_hash"),
        status: row.get("status"),
    }))
}

/// Resolve a token owner's username. Only active accounts resolve, so a
/// user disabled after issuance cannot rotate their way to new tokens.
pub(super) async fn find_username_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<String>> {
    let query = "SELECT username FROM users WHERE id = $1 AND status = 'active'";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup username by id")?;
    Ok(row.map(|row| row.get("username")))
}

/// Count a user's active (non-revoked) refresh tokens for the cap check.
pub(super) async fn count_active_tokens(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let query = "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1 AND NOT revoked";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count active refresh tokens")?;
    Ok(row.get(0))
}

/// Revoke the user's `n` oldest active tokens by issuance order.
/// Eviction revokes rather than deletes so the audit trail survives.
pub(super) async fn evict_oldest_tokens(pool: &PgPool, user_id: Uuid, n: i64) -> Result<u64> {
    let query = r"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE id IN (
            SELECT id FROM refresh_tokens
            WHERE user_id = $1 AND NOT revoked
            ORDER BY issued_at ASC
            LIMIT $2
        )
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(n)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to evict oldest refresh tokens")?;
    Ok(result.rows_affected())
}

/// Persist a new refresh token row and return the raw secret.
///
/// The secret is generated here so a hash collision (unique violation) can
/// be retried with a fresh value; the raw secret is only returned to the
/// caller, never stored.
pub(super) async fn insert_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    fingerprint_hash: Option<&[u8]>,
) -> Result<String> {
    let query = r"
        INSERT INTO refresh_tokens (user_id, token_hash, expires_at, device_fingerprint_hash)
        VALUES ($1, $2, $3, $4)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let secret = generate_refresh_secret()?;
        let token_hash = hash_refresh_secret(&secret);
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .bind(fingerprint_hash)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(secret),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert refresh token"),
        }
    }

    Err(anyhow!("failed to generate unique refresh token"))
}

/// Atomically claim a presented refresh token for rotation.
///
/// The single conditional update is what makes rotation single-use under
/// concurrency: two calls presenting the same secret cannot both match
/// `NOT revoked`. The fingerprint predicate keeps a mismatch from burning
/// the stored token.
pub(super) async fn claim_refresh_token(
    pool: &PgPool,
    token_hash: &[u8],
    fingerprint_hash: &[u8],
) -> Result<Option<ClaimedToken>> {
    let query = r"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE token_hash = $1
          AND NOT revoked
          AND expires_at > NOW()
          AND (device_fingerprint_hash IS NULL OR device_fingerprint_hash = $2)
        RETURNING id, user_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(fingerprint_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to claim refresh token")?;

    Ok(row.map(|row| ClaimedToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
    }))
}

/// Details for classifying a failed claim; telemetry only, never surfaced.
pub(super) struct RefreshRejection {
    pub(super) failure: TokenFailure,
    pub(super) token_id: Option<Uuid>,
}

/// Explain why [`claim_refresh_token`] claimed zero rows.
pub(super) async fn explain_refresh_failure(
    pool: &PgPool,
    token_hash: &[u8],
    fingerprint_hash: &[u8],
) -> Result<RefreshRejection> {
    let query = r"
        SELECT id, revoked, expires_at, device_fingerprint_hash
        FROM refresh_tokens
        WHERE token_hash = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to classify refresh failure")?;

    let Some(row) = row else {
        return Ok(RefreshRejection {
            failure: TokenFailure::NotFound,
            token_id: None,
        });
    };

    let token_id: Uuid = row.get("id");
    let revoked: bool = row.get("revoked");
    let expires_at: DateTime<Utc> = row.get("expires_at");
    let stored_fingerprint: Option<Vec<u8>> = row.get("device_fingerprint_hash");

    // A row revoked between the claim and this read counts as already used.
    let failure = if revoked {
        TokenFailure::Revoked
    } else if expires_at <= Utc::now() {
        TokenFailure::Expired
    } else if stored_fingerprint.is_some_and(|stored| stored != fingerprint_hash) {
        TokenFailure::FingerprintMismatch
    } else {
        TokenFailure::NotFound
    };

    Ok(RefreshRejection {
        failure,
        token_id: Some(token_id),
    })
}

/// Revoke whatever token matches the presented hash; logout is idempotent.
pub(super) async fn revoke_by_hash(pool: &PgPool, token_hash: &[u8]) -> Result<bool> {
    let query = "UPDATE refresh_tokens SET revoked = TRUE WHERE token_hash = $1 AND NOT revoked";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke refresh token")?;
    Ok(result.rows_affected() > 0)
}

/// Read one key from the settings provider. `None` means the key is absent,
/// which callers treat as a fatal configuration error.
pub(super) async fn get_setting(
    pool: &PgPool,
    section: &str,
    key: &str,
) -> Result<Option<String>> {
    let query = "SELECT value FROM settings WHERE section = $1 AND key = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(section)
        .bind(key)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .with_context(|| format!("failed to read setting {section}.{key}"))?;
    Ok(row.map(|row| row.get("value")))
}
