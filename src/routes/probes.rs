use axum::{middleware::from_fn_with_state, routing::get, Json, Router};

use crate::{
    auth::{
        middleware::{require_admin, require_user},
        MessageResponse,
    },
    state::AppState,
};

/// `/api/test/*`: one route per access level.
pub fn probe_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/public", get(public));
    let secured = Router::new()
        .route("/secured", get(secured))
        .route_layer(from_fn_with_state(state.clone(), require_user));
    let admin = Router::new()
        .route("/admin", get(admin))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new().nest(
        "/api/test",
        Router::new().merge(public).merge(secured).merge(admin),
    )
}

pub async fn public() -> Json<MessageResponse> {
    Json(MessageResponse::new("This is a public endpoint"))
}

pub async fn secured() -> Json<MessageResponse> {
    Json(MessageResponse::new("This is a secured endpoint"))
}

pub async fn admin() -> Json<MessageResponse> {
    Json(MessageResponse::new("This is an admin-only endpoint"))
}
