//! Kimba Petverse cart service library.
//!
//! Two persisted shopper carts (storefront variants and local apparel), a
//! cart drawer aggregating both, and a Shopify Storefront API client for the
//! catalog and hosted checkout. The binary serves all of it as JSON.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod shopify;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with the request-scoped middleware.
///
/// Sentry layers are added by the binary around this router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
        .with_state(state)
}
