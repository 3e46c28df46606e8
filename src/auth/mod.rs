use crate::state::AppState;
use axum::Router;

mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod services;

pub use dto::MessageResponse;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api/auth", handlers::auth_routes(state))
}
