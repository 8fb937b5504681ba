//! HTTP surface: session gate, routes, handlers and pages.

pub mod gate;
pub mod handlers;
pub mod pages;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use crate::blob::{BlobError, BlobStore};
use crate::error::MarketError;
use crate::notifications::Notifier;
use crate::storage::{DatabaseError, MarketDatabase};

pub use gate::{
    Authenticated, BuyerOnly, Denial, Identity, RequestContext, SESSION_COOKIE, SellerOnly,
};
pub use routes::build_router;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: MarketDatabase,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn Notifier>,
    /// Directory served under `/uploads`.
    pub upload_dir: PathBuf,
    pub session_ttl_secs: i64,
    pub max_body_bytes: usize,
}

/// Failures that end a request with an error page instead of a redirect.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            Self::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(pages::error_page("Something went wrong.")),
                )
                    .into_response()
            }
        }
    }
}

impl From<DatabaseError> for PageError {
    fn from(e: DatabaseError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<MarketError> for PageError {
    fn from(e: MarketError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<BlobError> for PageError {
    fn from(e: BlobError) -> Self {
        Self::Internal(e.to_string())
    }
}
