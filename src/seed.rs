use anyhow::Context;
use tracing::{debug, info};

use crate::auth::services::{
    UserService, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME,
};
use crate::users::Role;

struct DemoAccount {
    username: &'static str,
    password: &'static str,
    email: &'static str,
    role: Role,
}

const DEMO_ACCOUNTS: [DemoAccount; 2] = [
    DemoAccount {
        username: "testuser",
        password: "password123",
        email: "test@example.com",
        role: Role::User,
    },
    DemoAccount {
        username: DEFAULT_ADMIN_USERNAME,
        password: DEFAULT_ADMIN_PASSWORD,
        email: DEFAULT_ADMIN_EMAIL,
        role: Role::Admin,
    },
];

/// Create the demo accounts that are missing. Safe to run on every start.
pub async fn seed_demo_users(users: &UserService) -> anyhow::Result<()> {
    for account in &DEMO_ACCOUNTS {
        if users
            .find_by_username(account.username)
            .await
            .with_context(|| format!("look up {}", account.username))?
            .is_some()
        {
            debug!(username = account.username, "demo user already present");
            continue;
        }

        users
            .create_user(account.username, account.password, account.email, account.role)
            .await
            .with_context(|| format!("seed {}", account.username))?;
        info!(username = account.username, role = %account.role, "demo user created");
    }
    Ok(())
}
