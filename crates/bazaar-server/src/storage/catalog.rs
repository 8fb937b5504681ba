//! Catalog store: products owned by sellers.

use tracing::{info, instrument, warn};

use super::db::{DatabaseError, MarketDatabase};
use super::models::Product;
use crate::error::MarketError;

/// Editable product fields, as submitted by the seller.
#[derive(Debug, Clone, Copy)]
pub struct ProductInput<'a> {
    pub name: &'a str,
    pub description: &'a str,
    /// Passed through without validation.
    pub price: &'a str,
}

impl MarketDatabase {
    /// Create a product owned by `seller_id`.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        seller_id: i64,
        input: ProductInput<'_>,
        image: Option<&str>,
    ) -> Result<Product, MarketError> {
        let result = sqlx::query(
            "INSERT INTO products (seller_id, product_name, description, price, image) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(seller_id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.price)
        .bind(image)
        .execute(self.pool())
        .await
        .map_err(DatabaseError::from);

        let product_id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(DatabaseError::ForeignKey(_)) => {
                return Err(MarketError::NotFound(format!("User {seller_id}")));
            }
            Err(e) => return Err(e.into()),
        };

        info!(product_id, "Product created");
        self.get_product(product_id).await
    }

    /// Get a product by ID.
    pub async fn get_product(&self, product_id: i64) -> Result<Product, MarketError> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_id = ?")
            .bind(product_id)
            .fetch_optional(self.pool())
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| MarketError::NotFound(format!("Product {product_id}")))
    }

    /// List every product, oldest first.
    pub async fn list_products(&self) -> Result<Vec<Product>, DatabaseError> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY product_id ASC")
                .fetch_all(self.pool())
                .await?;
        Ok(products)
    }

    /// List the products owned by one seller, oldest first.
    pub async fn list_products_by_seller(
        &self,
        seller_id: i64,
    ) -> Result<Vec<Product>, DatabaseError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE seller_id = ? ORDER BY product_id ASC",
        )
        .bind(seller_id)
        .fetch_all(self.pool())
        .await?;
        Ok(products)
    }

    /// Fetch a product for its owner. Any other caller gets `Unauthorized`,
    /// which is indistinguishable from a missing product.
    pub async fn get_product_for_edit(
        &self,
        product_id: i64,
        seller_id: i64,
    ) -> Result<Product, MarketError> {
        sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE product_id = ? AND seller_id = ?",
        )
        .bind(product_id)
        .bind(seller_id)
        .fetch_optional(self.pool())
        .await
        .map_err(DatabaseError::from)?
        .ok_or(MarketError::Unauthorized)
    }

    /// Replace a product's fields. `image: None` keeps the stored image;
    /// every other field is overwritten, empty strings included.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: i64,
        seller_id: i64,
        input: ProductInput<'_>,
        image: Option<&str>,
    ) -> Result<Product, MarketError> {
        let result = sqlx::query(
            "UPDATE products SET product_name = ?, description = ?, price = ?, image = COALESCE(?, image) \
             WHERE product_id = ? AND seller_id = ?",
        )
        .bind(input.name)
        .bind(input.description)
        .bind(input.price)
        .bind(image)
        .bind(product_id)
        .bind(seller_id)
        .execute(self.pool())
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            warn!("Update of a product not owned by the caller");
            return Err(MarketError::Unauthorized);
        }

        info!("Product updated");
        self.get_product(product_id).await
    }

    /// Delete a product if `seller_id` owns it. Returns `false` (not an
    /// error) when nothing matched.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: i64, seller_id: i64) -> Result<bool, MarketError> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = ? AND seller_id = ?")
            .bind(product_id)
            .bind(seller_id)
            .execute(self.pool())
            .await
            .map_err(DatabaseError::from);

        match result {
            Ok(done) => {
                let removed = done.rows_affected() > 0;
                info!(removed, "Product delete");
                Ok(removed)
            }
            Err(DatabaseError::ForeignKey(_)) => Err(MarketError::ProductInUse(product_id)),
            Err(e) => Err(e.into()),
        }
    }
}
