pub mod memory;
pub mod repo;
pub mod repo_types;

pub use memory::InMemoryUserRepository;
pub use repo::{PgUserRepository, RepoError, UniqueField, UserRepository};
pub use repo_types::{NewUser, Role, User};
