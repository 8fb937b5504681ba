//! Credential store: user registration and login.

use bazaar_core::Role;
use tracing::{info, instrument, warn};

use super::db::{DatabaseError, MarketDatabase};
use super::models::User;
use crate::auth::password;
use crate::error::MarketError;

impl MarketDatabase {
    /// Register a new user. Fails with `DuplicateEmail` if the email is
    /// already taken, whatever the other fields are.
    #[instrument(skip(self, name, password), fields(email = %email, role = %role))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, MarketError> {
        if self.find_user_by_email(email).await?.is_some() {
            warn!("Registration with existing email");
            return Err(MarketError::DuplicateEmail);
        }

        let hash = password::hash_password(password)?;

        let result = sqlx::query("INSERT INTO users (name, email, password, role) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(&hash)
            .bind(role)
            .execute(self.pool())
            .await
            .map_err(DatabaseError::from);

        // The unique index still guards against a concurrent registration.
        let user_id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(DatabaseError::Conflict(_)) => return Err(MarketError::DuplicateEmail),
            Err(e) => return Err(e.into()),
        };

        info!(user_id, "User registered");
        self.get_user(user_id).await
    }

    /// Return the user registered with exactly this email and password.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, MarketError> {
        let Some(user) = self.find_user_by_email(email).await? else {
            warn!("Login for unknown email");
            return Err(MarketError::InvalidCredentials);
        };

        if password::verify_password(password, &user.password_hash)? {
            info!(user_id = user.user_id, "User authenticated");
            Ok(user)
        } else {
            warn!(user_id = user.user_id, "Failed login attempt");
            Err(MarketError::InvalidCredentials)
        }
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: i64) -> Result<User, MarketError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| MarketError::NotFound(format!("User {user_id}")))
    }

    /// Email comparison uses SQLite's default BINARY collation, so it is
    /// case-sensitive.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }
}
