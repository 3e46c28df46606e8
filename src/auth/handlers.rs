use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginResponse, MessageResponse, PublicUser, RegisterRequest, RegisterResponse},
        extractors::{AppJson, CurrentUser},
        middleware::{require_admin, require_user},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/test", get(test))
        .route("/create-admin", post(create_admin));

    let authenticated = Router::new()
        .route("/login", post(login))
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let admin = Router::new()
        .route("/users", get(list_users))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin)
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let user = state
        .users
        .register(&payload.username, &payload.password, &payload.email)
        .await?;

    Ok(Json(RegisterResponse {
        message: "User registered successfully".into(),
        username: user.username,
    }))
}

/// Credentials were already checked by `require_user`.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn login(user: CurrentUser) -> Json<LoginResponse> {
    info!(user_id = %user.id, "user logged in");
    Json(LoginResponse {
        message: "Login successful".into(),
        username: user.username,
        role: user.role,
    })
}

pub async fn test() -> &'static str {
    "Auth endpoint is working!"
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn create_admin(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let admin = state.users.create_admin().await?;
    info!(user_id = %admin.id, "admin user created");
    Ok(Json(MessageResponse::new("Admin user created successfully")))
}
