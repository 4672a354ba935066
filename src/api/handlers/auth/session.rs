//! Session endpoints: refresh token rotation and logout.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::cookie::{clear_refresh_cookie, extract_refresh_secret, refresh_cookie};
use super::error::{AuthError, TokenFailure};
use super::events::AuthEvent;
use super::rotation;
use super::state::AuthState;
use super::types::{RefreshRequest, RefreshResponse};
use super::utils::hash_refresh_secret;

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = RefreshResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid or expired token", body = String)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    // No cookie means there is nothing to rotate; surface the same generic
    // message as any other token failure.
    let Some(presented) = extract_refresh_secret(&headers) else {
        return AuthError::Token(TokenFailure::NotFound).into_response();
    };

    let mut events = Vec::new();
    let outcome = match rotation::rotate(
        &pool,
        &auth_state,
        &presented,
        &request.device_fingerprint,
        &mut events,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            auth_state.events().publish_all(&events);
            return err.into_response();
        }
    };
    auth_state.events().publish_all(&events);

    let pair = outcome.pair;
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

    let response = RefreshResponse {
        access_token: pair.access_token,
        expires_in: pair.expires_in_seconds,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let mut token_revoked = false;
    if let Some(presented) = extract_refresh_secret(&headers) {
        let presented_hash = hash_refresh_secret(&presented);
        match super::storage::revoke_by_hash(&pool, &presented_hash).await {
            Ok(revoked) => token_revoked = revoked,
            Err(err) => {
                // Logout stays best-effort; the cookie is cleared either way.
                error!("Failed to revoke refresh token on logout: {err:#}");
            }
        }
    }
    auth_state
        .events()
        .publish(&AuthEvent::LoggedOut { token_revoked });

    // Always clear the cookie, even if no token row matched.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_refresh_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[cfg(test)]
mod tests {
    use super::{logout, refresh};
    use crate::api::handlers::auth::fingerprint::test_fingerprint;
    use crate::api::handlers::auth::state::test_state;
    use crate::api::handlers::auth::types::RefreshRequest;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::header::SET_COOKIE;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn refresh_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = refresh(HeaderMap::new(), Extension(pool), Extension(test_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_unauthorized() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = RefreshRequest {
            device_fingerprint: test_fingerprint(),
        };
        let response = refresh(
            HeaderMap::new(),
            Extension(pool),
            Extension(test_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn logout_without_cookie_still_clears() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = logout(HeaderMap::new(), Extension(pool), Extension(test_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value: &HeaderValue| value.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.contains("custos_refresh=;"));
        assert!(cookie.contains("Max-Age=0"));
        Ok(())
    }
}
