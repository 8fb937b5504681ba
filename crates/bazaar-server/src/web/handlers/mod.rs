//! Route handlers.
//!
//! State-changing routes always answer with a redirect plus a flash message;
//! only storage failures produce an error page.

pub mod auth;
pub mod orders;
pub mod products;

use axum::response::{Html, IntoResponse, Redirect, Response};

use super::PageError;
use super::gate::RequestContext;
use super::pages::View;
use crate::storage::FlashCategory;

/// Queue a flash message and redirect to `to`.
pub(crate) async fn flash_redirect(
    ctx: &RequestContext,
    category: FlashCategory,
    message: &str,
    to: &str,
) -> Result<Response, PageError> {
    ctx.flash(category, message).await?;
    Ok(Redirect::to(to).into_response())
}

/// Render a page, consuming the pending flash messages.
pub(crate) async fn render(
    ctx: &RequestContext,
    page: impl FnOnce(&View<'_>) -> String,
) -> Result<Html<String>, PageError> {
    let flashes = ctx.take_flashes().await?;
    let view = View {
        identity: ctx.identity(),
        flashes: &flashes,
    };
    Ok(Html(page(&view)))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
