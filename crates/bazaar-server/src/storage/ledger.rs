//! Order ledger: order creation and role-scoped history.

use bazaar_core::db::unix_timestamp;
use bazaar_core::{OrderStatus, Role};
use tracing::{info, instrument};

use super::db::{DatabaseError, MarketDatabase};
use super::models::{Order, OrderView, SellerNotice};
use crate::error::MarketError;

const ORDER_VIEW_SELECT: &str = "SELECT o.order_id, u1.name AS buyer_name, p.product_name, u2.name AS seller_name, \
     o.status, o.order_date \
     FROM orders o \
     JOIN users u1 ON o.buyer_id = u1.user_id \
     JOIN products p ON o.product_id = p.product_id \
     JOIN users u2 ON p.seller_id = u2.user_id";

impl MarketDatabase {
    /// Record a `Pending` order stamped with the current time.
    ///
    /// Product existence is left to the foreign key; a dangling product id
    /// comes back as `NotFound`. Sellers may order their own products.
    #[instrument(skip(self))]
    pub async fn place_order(&self, buyer_id: i64, product_id: i64) -> Result<Order, MarketError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO orders (buyer_id, product_id, status, order_date) VALUES (?, ?, ?, ?)",
        )
        .bind(buyer_id)
        .bind(product_id)
        .bind(OrderStatus::Pending)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(DatabaseError::from);

        let order_id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(DatabaseError::ForeignKey(_)) => {
                return Err(MarketError::NotFound(format!("Product {product_id}")));
            }
            Err(e) => return Err(e.into()),
        };

        info!(order_id, "Order placed");
        self.get_order(order_id).await
    }

    /// Get an order by ID.
    pub async fn get_order(&self, order_id: i64) -> Result<Order, MarketError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = ?")
            .bind(order_id)
            .fetch_optional(self.pool())
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| MarketError::NotFound(format!("Order {order_id}")))
    }

    /// Order history for a user, newest first.
    ///
    /// Sellers see orders for the products they own; buyers see the orders
    /// they placed.
    pub async fn list_orders_for_user(
        &self,
        user_id: i64,
        role: Role,
    ) -> Result<Vec<OrderView>, DatabaseError> {
        let filter = match role {
            Role::Seller => "WHERE p.seller_id = ?",
            Role::Buyer => "WHERE o.buyer_id = ?",
        };
        let sql = format!("{ORDER_VIEW_SELECT} {filter} ORDER BY o.order_date DESC, o.order_id DESC");

        let orders = sqlx::query_as::<_, OrderView>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        Ok(orders)
    }

    /// Seller contact details and product name for an order.
    pub async fn seller_notice(&self, order_id: i64) -> Result<SellerNotice, MarketError> {
        sqlx::query_as::<_, SellerNotice>(
            "SELECT u.email AS seller_email, u.name AS seller_name, p.product_name \
             FROM orders o \
             JOIN products p ON o.product_id = p.product_id \
             JOIN users u ON p.seller_id = u.user_id \
             WHERE o.order_id = ?",
        )
        .bind(order_id)
        .fetch_optional(self.pool())
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| MarketError::NotFound(format!("Order {order_id}")))
    }
}
