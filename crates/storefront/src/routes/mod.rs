//! HTTP route handlers for the cart service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//!
//! # Products
//! GET  /api/products?first=N        - Product listing
//! GET  /api/products/{handle}       - Product detail
//!
//! # Cart drawer
//! GET  /api/cart                    - Drawer view (both carts + summary)
//! POST /api/cart/panel              - Open/close the drawer
//!
//! # Storefront cart
//! POST /api/cart/shop/add           - Add variant (snapshot from product)
//! POST /api/cart/shop/update        - Set quantity (<= 0 removes)
//! POST /api/cart/shop/remove        - Remove line
//! POST /api/cart/shop/clear         - Empty cart and forget checkout
//! POST /api/cart/shop/checkout      - Create hosted checkout
//!
//! # Product cart
//! POST /api/cart/products/add       - Add one unit of (id, size)
//! POST /api/cart/products/update    - Set quantity (<= 0 removes)
//! POST /api/cart/products/remove    - Remove line
//! POST /api/cart/products/clear     - Empty cart
//! POST /api/cart/products/checkout  - Coming soon
//! ```

pub mod cart;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{handle}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/panel", post(cart::panel))
        .route("/shop/add", post(cart::shop_add))
        .route("/shop/update", post(cart::shop_update))
        .route("/shop/remove", post(cart::shop_remove))
        .route("/shop/clear", post(cart::shop_clear))
        .route("/shop/checkout", post(cart::shop_checkout))
        .route("/products/add", post(cart::product_add))
        .route("/products/update", post(cart::product_update))
        .route("/products/remove", post(cart::product_remove))
        .route("/products/clear", post(cart::product_clear))
        .route("/products/checkout", post(cart::product_checkout))
}

/// Create all routes for the service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
