//! Authentication helpers.
//!
//! Provides password hashing and opaque session tokens.

pub mod password;
pub mod token;
