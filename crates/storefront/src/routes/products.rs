//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::shopify::Product;
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page size; defaults and bounds are applied by the client.
    pub first: Option<i64>,
}

/// List products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = state.storefront().get_products(query.first).await?;
    Ok(Json(products))
}

/// Show a single product by handle.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<Product>> {
    let product = state.storefront().get_product_by_handle(&handle).await?;
    Ok(Json(product))
}
