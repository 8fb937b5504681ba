//! Database connection and initialization.

pub use bazaar_core::db::DatabaseError;

bazaar_core::define_database!(MarketDatabase, "Market database migrations complete");
