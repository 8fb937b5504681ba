//! Data models for Bazaar storage.

use bazaar_core::{OrderStatus, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    /// Argon2id PHC string.
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub product_id: i64,
    pub seller_id: i64,
    pub product_name: String,
    pub description: String,
    /// Stored exactly as the seller typed it.
    pub price: String,
    /// Blob store reference, e.g. `uploads/lamp.png`.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub order_id: i64,
    pub buyer_id: i64,
    pub product_id: i64,
    pub status: OrderStatus,
    pub order_date: i64,
}

/// One row of the order history page, with all names resolved.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderView {
    pub order_id: i64,
    pub buyer_name: String,
    pub product_name: String,
    pub seller_name: String,
    pub status: OrderStatus,
    pub order_date: i64,
}

/// What the notifier needs to tell a seller about a new order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SellerNotice {
    pub seller_email: String,
    pub seller_name: String,
    pub product_name: String,
}

/// A live session joined with its (optional) user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub token_hash: String,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub role: Option<Role>,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Danger,
    Warning,
}

impl FlashCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
            Self::Warning => "warning",
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn new(category: FlashCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}
