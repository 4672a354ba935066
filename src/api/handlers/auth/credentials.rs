//! Username/password validation against the identity store.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use sqlx::PgPool;

use super::error::{AuthError, AuthFailure};
use super::storage::find_user_by_username;
use uuid::Uuid;

pub(super) enum CredentialOutcome {
    Valid { user_id: Uuid },
    Rejected(AuthFailure),
}

/// Validate a username/password pair.
///
/// Inactive accounts short-circuit before any password comparison. Storage
/// failures propagate; they are never retried here.
pub(super) async fn validate_credentials(
    pool: &PgPool,
    username: &str,
    password: &str,
) -> Result<CredentialOutcome, AuthError> {
    let Some(record) = find_user_by_username(pool, username)
        .await
        .map_err(AuthError::Storage)?
    else {
        return Ok(CredentialOutcome::Rejected(AuthFailure::UserNotFound));
    };

    match record.status.as_str() {
        "active" => {}
        "disabled" => {
            return Ok(CredentialOutcome::Rejected(AuthFailure::AccountDisabled));
        }
        _ => {
            return Ok(CredentialOutcome::Rejected(
                AuthFailure::AccountRequiresAction,
            ));
        }
    }

    let parsed = PasswordHash::new(&record.password_hash).map_err(|err| {
        AuthError::Storage(anyhow::anyhow!(
            "stored password hash for user {} is not valid PHC: {err}",
            record.user_id
        ))
    })?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    {
        Ok(CredentialOutcome::Valid {
            user_id: record.user_id,
        })
    } else {
        Ok(CredentialOutcome::Rejected(AuthFailure::InvalidPassword))
    }
}

#[cfg(test)]
pub(crate) fn hash_password(password: &str) -> String {
    use argon2::PasswordHasher;
    use argon2::password_hash::{SaltString, rand_core::OsRng};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("hash test password")
        .to_string()
}
