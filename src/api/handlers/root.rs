use axum::response::IntoResponse;

use crate::APP_USER_AGENT;

/// Undocumented landing route; useful for quick smoke checks.
pub async fn root() -> impl IntoResponse {
    APP_USER_AGENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn root_returns_user_agent() {
        let response = root().await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
