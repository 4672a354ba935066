//! Login endpoint: throttle, validate credentials, issue a token pair.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::cookie::refresh_cookie;
use super::credentials::{CredentialOutcome, validate_credentials};
use super::error::AuthError;
use super::events::AuthEvent;
use super::issuer;
use super::state::AuthState;
use super::throttle::ThrottleDecision;
use super::types::{LoginRequest, LoginResponse, LoginUser};
use super::utils::extract_client_ip;

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 429, description = "Too many attempts", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let username = request.username.trim().to_string();
    if username.is_empty() {
        return AuthError::Validation("Missing username".to_string()).into_response();
    }
    if request.password.is_empty() {
        return AuthError::Validation("Missing password".to_string()).into_response();
    }

    let client_ip = extract_client_ip(&headers);
    let mut events = vec![AuthEvent::LoginAttempt {
        username: username.clone(),
    }];

    // Throttled requests are rejected before touching the identity store,
    // regardless of whether the credentials would have been correct.
    if auth_state.throttle().check(client_ip.as_deref()) == ThrottleDecision::Limited {
        events.push(AuthEvent::LoginRateLimited {
            ip: client_ip.clone().unwrap_or_else(|| "unknown".to_string()),
        });
        auth_state.events().publish_all(&events);
        return AuthError::RateLimit {
            retry_after_seconds: auth_state.throttle().retry_after_seconds(client_ip.as_deref()),
        }
        .into_response();
    }

    let user_id = match validate_credentials(&pool, &username, &request.password).await {
        Ok(CredentialOutcome::Valid { user_id }) => user_id,
        Ok(CredentialOutcome::Rejected(reason)) => {
            auth_state.throttle().record_failure(client_ip.as_deref());
            events.push(AuthEvent::LoginFailed {
                username,
                reason,
            });
            auth_state.events().publish_all(&events);
            return AuthError::Authentication(reason).into_response();
        }
        Err(err) => {
            auth_state.events().publish_all(&events);
            return err.into_response();
        }
    };

    let pair = match issuer::issue(
        &pool,
        &auth_state,
        &username,
        user_id,
        Some(&request.device_fingerprint),
        &mut events,
    )
    .await
    {
        Ok(pair) => pair,
        Err(err) => {
            auth_state.events().publish_all(&events);
            return err.into_response();
        }
    };

    events.push(AuthEvent::LoginSucceeded { user_id });
    auth_state.events().publish_all(&events);

    let max_age = (pair.refresh_expires_at - chrono::Utc::now()).num_seconds();
    let mut response_headers = HeaderMap::new();
    match refresh_cookie(auth_state.config(), &pair.refresh_token, max_age) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build refresh cookie: {err}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
                .into_response();
        }
    }

    let response = LoginResponse {
        access_token: pair.access_token,
        expires_in: pair.expires_in_seconds,
        user: LoginUser {
            username,
            uuid: user_id.to_string(),
        },
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::login;
    use crate::api::handlers::auth::fingerprint::test_fingerprint;
    use crate::api::handlers::auth::state::test_state;
    use crate::api::handlers::auth::types::LoginRequest;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(HeaderMap::new(), Extension(pool), Extension(test_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_rejects_blank_username() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = LoginRequest {
            username: "   ".to_string(),
            password: "hunter2".to_string(),
            device_fingerprint: test_fingerprint(),
        };
        let response = login(
            HeaderMap::new(),
            Extension(pool),
            Extension(test_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_rejects_empty_password() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = LoginRequest {
            username: "alice".to_string(),
            password: String::new(),
            device_fingerprint: test_fingerprint(),
        };
        let response = login(
            HeaderMap::new(),
            Extension(pool),
            Extension(test_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
