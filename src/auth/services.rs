use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, hash_password_async, verify_password_async};
use crate::users::{NewUser, RepoError, Role, UniqueField, User, UserRepository};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Email already exists")]
    EmailTaken,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error(transparent)]
    Repository(RepoError),
    #[error("password hashing failed: {0}")]
    Hashing(anyhow::Error),
}

impl From<RepoError> for RegisterError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(UniqueField::Username) => RegisterError::UsernameTaken,
            RepoError::Conflict(UniqueField::Email) => RegisterError::EmailTaken,
            other => RegisterError::Repository(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found with username: {0}")]
    UserNotFound(String),
    #[error("Invalid credentials")]
    BadCredentials,
    #[error(transparent)]
    Repository(#[from] RepoError),
    #[error("password verification failed: {0}")]
    Hashing(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CreateAdminError {
    #[error("Admin user already exists")]
    AlreadyExists,
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    Repository(#[from] RepoError),
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn normalize_username(raw: &str) -> &str {
    raw.trim()
}

lazy_static! {
    /// Verified against when the username is unknown, so both login failures cost one Argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("securitydemo-no-such-user").ok();
}

/// Registration, lookup and credential checks over a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Register a new account with role USER.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        raw_email: &str,
    ) -> Result<User, RegisterError> {
        self.create_user(username, password, raw_email, Role::User)
            .await
    }

    /// Validate, check uniqueness, hash and persist a user with the given role.
    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        raw_email: &str,
        role: Role,
    ) -> Result<User, RegisterError> {
        let username = normalize_username(username);
        let email = normalize_email(raw_email);

        if username.is_empty() {
            return Err(RegisterError::InvalidInput("Username is required"));
        }
        if password.is_empty() {
            return Err(RegisterError::InvalidInput("Password is required"));
        }
        if !is_valid_email(&email) {
            warn!(%email, "invalid email");
            return Err(RegisterError::InvalidInput("Invalid email"));
        }

        if self.repo.exists_by_username(username).await? {
            warn!(%username, "username already exists");
            return Err(RegisterError::UsernameTaken);
        }
        if self.repo.exists_by_email(&email).await? {
            warn!(%email, "email already exists");
            return Err(RegisterError::EmailTaken);
        }

        let password_hash = hash_password_async(password.to_string())
            .await
            .map_err(RegisterError::Hashing)?;

        // The store enforces uniqueness too; a concurrent insert surfaces as Conflict.
        let user = self
            .repo
            .insert(NewUser {
                username: username.to_string(),
                password_hash,
                email,
                role,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "user registered");
        Ok(user)
    }

    /// Register the default admin account, then promote it.
    #[instrument(skip(self))]
    pub async fn create_admin(&self) -> Result<User, CreateAdminError> {
        if self.find_by_username(DEFAULT_ADMIN_USERNAME).await?.is_some() {
            return Err(CreateAdminError::AlreadyExists);
        }
        let user = self
            .register(
                DEFAULT_ADMIN_USERNAME,
                DEFAULT_ADMIN_PASSWORD,
                DEFAULT_ADMIN_EMAIL,
            )
            .await?;
        match self.change_role(user.id, Role::Admin).await {
            Ok(admin) => Ok(admin),
            Err(e) => {
                error!(
                    error = %e,
                    user_id = %user.id,
                    "admin account stored with role USER; promote it manually"
                );
                Err(e.into())
            }
        }
    }

    pub async fn change_role(&self, user_id: Uuid, role: Role) -> Result<User, RepoError> {
        let user = self.repo.update_role(user_id, role).await?;
        info!(%user_id, %role, "user role changed");
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        self.repo.find_by_username(normalize_username(username)).await
    }

    /// Credential record for the login pipeline.
    pub async fn load_user_by_username(&self, username: &str) -> Result<User, AuthError> {
        self.repo
            .find_by_username(normalize_username(username))
            .await?
            .ok_or_else(|| AuthError::UserNotFound(username.to_string()))
    }

    /// Check a username/password pair against the stored hash.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = match self.load_user_by_username(username).await {
            Ok(user) => user,
            Err(e @ AuthError::UserNotFound(_)) => {
                if let Some(dummy) = DUMMY_HASH.as_ref() {
                    let _ = verify_password_async(password.to_string(), dummy.clone()).await;
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let ok = verify_password_async(password.to_string(), user.password_hash.clone())
            .await
            .map_err(AuthError::Hashing)?;
        if !ok {
            warn!(%username, user_id = %user.id, "login invalid password");
            return Err(AuthError::BadCredentials);
        }
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        self.repo.list().await
    }
}
