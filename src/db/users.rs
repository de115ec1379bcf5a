//! User registration and lookup.

use crate::error::{Error, Result};
use crate::model::{User, UserId};

impl super::Db {
    /// Register a user by email. A taken email is a conflict.
    pub async fn create_user(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(Error::Validation(format!("{email:?} is not a valid email")));
        }

        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email) VALUES ($1, $2)
             RETURNING id, email, created_at",
        )
        .bind(UserId::new())
        .bind(&email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::unique_violation(e, format!("user {email} already exists")))
    }

    /// Look up a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        sqlx::query_as::<_, User>("SELECT id, email, created_at FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {email}")))
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
