//! Router assembly.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::gate::session_middleware;
use super::handlers::{auth, health, orders, products};
use crate::blob::UPLOADS_PREFIX;

/// Build the application router.
///
/// Matched page routes run behind the session middleware. `/health`, the
/// stored uploads and unmatched paths are served without touching sessions.
pub fn build_router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(products::index))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/dashboard", get(products::dashboard))
        .route(
            "/add_product",
            get(products::add_product_page).post(products::add_product),
        )
        .route("/products", get(products::list_products))
        .route("/place_order/{product_id}", post(orders::place_order))
        .route(
            "/edit_product/{product_id}",
            get(products::edit_product_page).post(products::edit_product),
        )
        .route("/delete_product/{product_id}", post(products::delete_product))
        .route("/orders", get(orders::list_orders))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.max_body_bytes));

    Router::new()
        .merge(pages)
        .route("/health", get(health))
        .nest_service(
            &format!("/{UPLOADS_PREFIX}"),
            ServeDir::new(&state.upload_dir),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
