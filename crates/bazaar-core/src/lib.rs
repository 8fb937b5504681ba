//! `Bazaar` Core Library
//!
//! Shared functionality for `Bazaar` components:
//! - `SQLite` pool helpers and the `define_database!` macro
//! - Configuration resolution and hierarchy
//! - Account roles and order status
//! - Common error types

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use domain::{OrderStatus, Role};
pub use error::{Error, Result};
