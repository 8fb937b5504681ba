//! Order placement and history.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{Html, Response};
use tracing::{instrument, warn};

use super::{flash_redirect, render};
use crate::error::MarketError;
use crate::notifications::dispatch_seller_notice;
use crate::storage::FlashCategory;
use crate::web::gate::{Authenticated, BuyerOnly, LoginRequired};
use crate::web::{AppState, PageError, pages};

/// `POST /place_order/{product_id}`
///
/// The seller is notified after the order is stored; notification failures
/// never reach the buyer.
#[instrument(skip(state, buyer))]
pub async fn place_order(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    buyer: BuyerOnly,
) -> Result<Response, PageError> {
    let BuyerOnly { ctx, identity } = buyer;

    let order = match state.db.place_order(identity.user_id, product_id).await {
        Ok(order) => order,
        Err(MarketError::NotFound(_)) => {
            return flash_redirect(&ctx, FlashCategory::Danger, "Product not found.", "/products")
                .await;
        }
        Err(e) => return Err(e.into()),
    };

    match state.db.seller_notice(order.order_id).await {
        Ok(notice) => {
            dispatch_seller_notice(Arc::clone(&state.notifier), notice);
        }
        Err(e) => {
            warn!(order_id = order.order_id, error = %e, "Cannot resolve seller to notify");
        }
    }

    flash_redirect(
        &ctx,
        FlashCategory::Success,
        "Order placed successfully!",
        "/products",
    )
    .await
}

/// `GET /orders`
pub async fn list_orders(
    State(state): State<AppState>,
    Authenticated { ctx, identity, .. }: Authenticated<LoginRequired>,
) -> Result<Html<String>, PageError> {
    let orders = state
        .db
        .list_orders_for_user(identity.user_id, identity.role)
        .await?;
    render(&ctx, |view| pages::orders(view, &orders)).await
}
