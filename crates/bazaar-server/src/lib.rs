//! Bazaar marketplace server library.
//!
//! Sellers list products, buyers place orders, and both see their order
//! history. Exposed as a library so the router can be driven from tests.

pub mod auth;
pub mod blob;
pub mod error;
pub mod notifications;
pub mod storage;
pub mod web;
