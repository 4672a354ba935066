use super::handlers::{auth, health};
use utoipa::openapi::{InfoBuilder, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both
/// served and documented. Routes added outside (like `/` or preflight-only
/// `OPTIONS /health`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut custos_tag = Tag::new("custos");
    custos_tag.description = Some("Session and token lifecycle API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login, refresh rotation, and logout".to_string());

    let mut openapi = cargo_openapi();
    openapi.tags = Some(vec![custos_tag, auth_tag]);

    OpenApiRouter::with_openapi(openapi)
        .routes(routes!(health::health))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::refresh))
        .routes(routes!(auth::session::logout))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    OpenApiBuilder::new().info(info).build()
}
