//! `SQLite` storage for the Bazaar server.
//!
//! Provides persistence for users (credential store), products (catalog),
//! orders (ledger) and server-side sessions.

mod catalog;
mod credentials;
mod db;
mod ledger;
mod models;
mod sessions;


pub use catalog::ProductInput;
pub use db::{DatabaseError, MarketDatabase};
pub use models::*;
