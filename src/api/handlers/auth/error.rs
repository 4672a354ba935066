//! Closed error taxonomy for the session/token lifecycle.
//!
//! Internal reasons stay internal: authentication and token failures are
//! surfaced with one generic message each so callers cannot enumerate users
//! or probe token state.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Internal reason a credential check was rejected. Never surfaced directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    UserNotFound,
    AccountDisabled,
    AccountRequiresAction,
    InvalidPassword,
}

/// Internal reason a presented refresh token was rejected. Never surfaced
/// directly; `FingerprintMismatch` is additionally logged for security
/// monitoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFailure {
    NotFound,
    Expired,
    Revoked,
    FingerprintMismatch,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid credentials")]
    Authentication(AuthFailure),
    #[error("too many attempts")]
    RateLimit { retry_after_seconds: u64 },
    #[error("invalid or expired token")]
    Token(TokenFailure),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Authentication(_) => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()).into_response()
            }
            Self::RateLimit {
                retry_after_seconds,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many attempts, retry in {retry_after_seconds}s"),
            )
                .into_response(),
            Self::Token(_) => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            )
                .into_response(),
            Self::Configuration(message) => {
                error!("Configuration error: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()).into_response()
            }
            Self::Storage(err) => {
                error!("Storage error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn authentication_failures_share_one_message() {
        for failure in [
            AuthFailure::UserNotFound,
            AuthFailure::AccountDisabled,
            AuthFailure::AccountRequiresAction,
            AuthFailure::InvalidPassword,
        ] {
            let response = AuthError::Authentication(failure).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn token_failures_share_one_message() {
        for failure in [
            TokenFailure::NotFound,
            TokenFailure::Expired,
            TokenFailure::Revoked,
            TokenFailure::FingerprintMismatch,
        ] {
            let response = AuthError::Token(failure).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn rate_limit_carries_retry_hint() {
        let response = AuthError::RateLimit {
            retry_after_seconds: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = AuthError::Storage(anyhow!("pool exhausted")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response =
            AuthError::Configuration("missing tokens.max_tokens_per_user".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_passes_message_through() {
        let response = AuthError::Validation("Missing username".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn failure_reasons_serialize_snake_case() -> anyhow::Result<()> {
        let value = serde_json::to_value(AuthFailure::AccountDisabled)?;
        assert_eq!(value, "account_disabled");
        let value = serde_json::to_value(TokenFailure::FingerprintMismatch)?;
        assert_eq!(value, "fingerprint_mismatch");
        Ok(())
    }
}
