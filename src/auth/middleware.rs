use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::extractors::{BasicCredentials, CurrentUser};
use crate::error::AppError;
use crate::state::AppState;
use crate::users::Role;

/// Authenticate the request and require at least `required`.
async fn authorize(
    state: &AppState,
    mut req: Request,
    next: Next,
    required: Role,
) -> Result<Response, AppError> {
    let creds = BasicCredentials::from_headers(req.headers())?.ok_or(AppError::Unauthorized)?;
    let user = state
        .users
        .authenticate(&creds.username, &creds.password)
        .await?;

    if !user.role.satisfies(required) {
        warn!(username = %user.username, role = %user.role, %required, "access denied");
        return Err(AppError::Forbidden);
    }

    debug!(username = %user.username, role = %user.role, "request authenticated");
    req.extensions_mut().insert(CurrentUser::from(&user));
    Ok(next.run(req).await)
}

/// Any authenticated user.
pub async fn require_user(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&state, req, next, Role::User).await
}

pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&state, req, next, Role::Admin).await
}
