//! Refresh token rotation: claim the presented token, issue its successor.

use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::error::{AuthError, TokenFailure};
use super::events::AuthEvent;
use super::fingerprint::{DeviceFingerprint, short_hash_of};
use super::issuer::{self, TokenPair};
use super::state::AuthState;
use super::storage;
use super::utils::hash_refresh_secret;

pub(super) struct RotationOutcome {
    pub(super) pair: TokenPair,
    pub(super) user_id: Uuid,
}

/// Exchange a presented refresh secret for a new pair, revoking it in the
/// same conditional update that validates it (single-use enforcement).
///
/// All failure classes surface as the same generic [`AuthError::Token`];
/// the precise reason travels only through events.
pub(super) async fn rotate(
    pool: &PgPool,
    state: &AuthState,
    presented_secret: &str,
    fingerprint: &DeviceFingerprint,
    events: &mut Vec<AuthEvent>,
) -> Result<RotationOutcome, AuthError> {
    let presented_hash = hash_refresh_secret(presented_secret);
    let fingerprint_hash = fingerprint.hash();

    let claimed = storage::claim_refresh_token(pool, &presented_hash, &fingerprint_hash)
        .await
        .map_err(AuthError::Storage)?;

    let Some(claimed) = claimed else {
        // Zero rows claimed: classify for telemetry, surface generically.
        let rejection = storage::explain_refresh_failure(pool, &presented_hash, &fingerprint_hash)
            .await
            .unwrap_or_else(|err| {
                error!("Failed to classify refresh rejection: {err:#}");
                storage::RefreshRejection {
                    failure: TokenFailure::NotFound,
                    token_id: None,
                }
            });
        if rejection.failure == TokenFailure::FingerprintMismatch {
            events.push(AuthEvent::FingerprintMismatch {
                token_id: rejection.token_id.unwrap_or(Uuid::nil()),
                presented: short_hash_of(&fingerprint_hash),
            });
        }
        events.push(AuthEvent::RefreshFailed {
            reason: rejection.failure,
        });
        return Err(AuthError::Token(rejection.failure));
    };

    // A missing or no-longer-active owner fails closed: the presented token
    // was already burned by the claim above.
    let Some(username) = storage::find_username_by_id(pool, claimed.user_id)
        .await
        .map_err(AuthError::Storage)?
    else {
        events.push(AuthEvent::RefreshFailed {
            reason: TokenFailure::NotFound,
        });
        return Err(AuthError::Token(TokenFailure::NotFound));
    };

    let pair = issuer::issue(
        pool,
        state,
        &username,
        claimed.user_id,
        Some(fingerprint),
        events,
    )
    .await?;

    events.push(AuthEvent::RefreshSucceeded {
        user_id: claimed.user_id,
    });

    Ok(RotationOutcome {
        pair,
        user_id: claimed.user_id,
    })
}
