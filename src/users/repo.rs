use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::repo_types::{NewUser, Role, User, UserRow};

/// Column guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated on {0:?}")]
    Conflict(UniqueField),
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt user row: {0}")]
    Corrupt(String),
}

/// Persistence interface for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn exists_by_username(&self, username: &str) -> Result<bool, RepoError>;
    async fn exists_by_email(&self, email: &str) -> Result<bool, RepoError>;
    /// Insert a user; uniqueness violations surface as [`RepoError::Conflict`].
    async fn insert(&self, user: NewUser) -> Result<User, RepoError>;
    async fn update_role(&self, id: Uuid, role: Role) -> Result<User, RepoError>;
    async fn list(&self) -> Result<Vec<User>, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_user(row: UserRow) -> Result<User, RepoError> {
    User::try_from(row).map_err(RepoError::Corrupt)
}

fn map_insert_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_username_key") => return RepoError::Conflict(UniqueField::Username),
                Some("users_email_key") => return RepoError::Conflict(UniqueField::Email),
                _ => {}
            }
        }
    }
    RepoError::Database(e)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, email, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_user).transpose()
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepoError> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)"#)
                .bind(username)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepoError> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)"#)
                .bind(email)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password_hash, email, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, email, role, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)?;
        into_user(row)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET role = $2
            WHERE id = $1
            RETURNING id, username, password_hash, email, role, created_at
            "#,
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)?;
        into_user(row)
    }

    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, email, role, created_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(into_user).collect()
    }
}
