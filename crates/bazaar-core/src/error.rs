//! Error types for `Bazaar` core library.

use thiserror::Error;

/// Result type alias using `Bazaar` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Bazaar` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Role string is neither `seller` nor `buyer`
    #[error("Unknown role: {0:?}")]
    UnknownRole(String),
}
