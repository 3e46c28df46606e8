use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::services::{AuthError, CreateAdminError, RegisterError};
use crate::users::RepoError;

pub const BASIC_REALM: &str = r#"Basic realm="securitydemo""#;

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("access denied")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: msg })).into_response()
            }
            AppError::Unauthorized => {
                let mut res = (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorBody {
                        error: "Unauthorized".into(),
                    }),
                )
                    .into_response();
                res.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(BASIC_REALM),
                );
                res
            }
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(ErrorBody {
                    error: "Access denied".into(),
                }),
            )
                .into_response(),
            AppError::Internal(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "Internal server error".into(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), "rejected request body");
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<RegisterError> for AppError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::UsernameTaken
            | RegisterError::EmailTaken
            | RegisterError::InvalidInput(_) => AppError::BadRequest(e.to_string()),
            RegisterError::Repository(e) => e.into(),
            RegisterError::Hashing(e) => AppError::Internal(e),
        }
    }
}

impl From<CreateAdminError> for AppError {
    fn from(e: CreateAdminError) -> Self {
        match e {
            CreateAdminError::AlreadyExists => AppError::BadRequest(e.to_string()),
            CreateAdminError::Register(e) => e.into(),
            CreateAdminError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UserNotFound(username) => {
                warn!(%username, "login unknown username");
                AppError::Unauthorized
            }
            AuthError::BadCredentials => AppError::Unauthorized,
            AuthError::Repository(e) => e.into(),
            AuthError::Hashing(e) => AppError::Internal(e),
        }
    }
}
