//! Marketplace error taxonomy.
//!
//! Everything except `Database` and `PasswordHash` is an expected outcome
//! that the HTTP layer turns into a redirect with a flash message.

use bazaar_core::db::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Role mismatch, or acting on a product the caller does not own.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown role: {0:?}")]
    InvalidRole(String),

    #[error("Product {0} has orders and cannot be deleted")]
    ProductInUse(i64),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<argon2::password_hash::Error> for MarketError {
    fn from(e: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(e.to_string())
    }
}

impl From<bazaar_core::Error> for MarketError {
    fn from(e: bazaar_core::Error) -> Self {
        match e {
            bazaar_core::Error::UnknownRole(role) => Self::InvalidRole(role),
            other => Self::Database(DatabaseError::Query(other.to_string())),
        }
    }
}
