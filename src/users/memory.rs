use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{RepoError, UniqueField, UserRepository};
use super::repo_types::{NewUser, Role, User};

/// Process-local user store with the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.email == email))
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(RepoError::Conflict(UniqueField::Username));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict(UniqueField::Email));
        }
        let stored = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            role: user.role,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(stored.clone());
        Ok(stored)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn list(&self) -> Result<Vec<User>, RepoError> {
        Ok(self.users.read().await.clone())
    }
}
