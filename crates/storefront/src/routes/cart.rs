//! Cart route handlers.
//!
//! Every mutation answers with the refreshed [`DrawerView`] so the client can
//! re-render the drawer without a second request.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use kimba_core::{LocalProductId, VariantId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::cart::{
    CheckoutFailure, CheckoutOutcome, DrawerView, LocalCartItemInput, Notification,
    RemoteCartLineItem,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

/// Highest unit price accepted for a local product.
const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Open or close the drawer panel.
#[derive(Debug, Deserialize)]
pub struct PanelForm {
    pub open: bool,
}

/// Add a storefront variant to the cart.
#[derive(Debug, Deserialize)]
pub struct ShopAddForm {
    pub handle: String,
    pub variant_id: VariantId,
    pub quantity: Option<u32>,
}

/// Set a storefront line's quantity. Zero or less removes it.
#[derive(Debug, Deserialize)]
pub struct ShopUpdateForm {
    pub variant_id: VariantId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct ShopRemoveForm {
    pub variant_id: VariantId,
}

/// Set a product line's quantity. Zero or less removes it.
#[derive(Debug, Deserialize)]
pub struct ProductUpdateForm {
    pub id: LocalProductId,
    pub size: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProductRemoveForm {
    pub id: LocalProductId,
    pub size: String,
}

/// Current drawer contents.
pub async fn show(State(state): State<AppState>) -> Json<DrawerView> {
    Json(state.drawer().view())
}

/// Open or close the drawer.
pub async fn panel(
    State(state): State<AppState>,
    Json(form): Json<PanelForm>,
) -> Json<DrawerView> {
    state.drawer().set_open(form.open);
    Json(state.drawer().view())
}

// =============================================================================
// Storefront cart
// =============================================================================

/// Add a variant, snapshotting the product as it is now.
///
/// A variant missing from the cached product triggers one fresh lookup
/// before answering 404.
#[instrument(skip(state))]
pub async fn shop_add(
    State(state): State<AppState>,
    Json(form): Json<ShopAddForm>,
) -> Result<Json<DrawerView>> {
    let storefront = state.storefront();
    let mut product = storefront.get_product_by_handle(&form.handle).await?;
    if product.variant(&form.variant_id).is_none() {
        debug!("Variant missing from cached product, refetching");
        storefront.invalidate_product(&form.handle).await;
        product = storefront.get_product_by_handle(&form.handle).await?;
    }

    let variant = product.variant(&form.variant_id).ok_or_else(|| {
        AppError::NotFound(format!(
            "Variant {} of product {}",
            form.variant_id, form.handle
        ))
    })?;

    let quantity = form.quantity.unwrap_or(1);
    state
        .drawer()
        .shop()
        .add_item(RemoteCartLineItem::from_variant(&product, variant, quantity));

    add_breadcrumb(
        "cart",
        "Added to storefront cart",
        &[
            ("handle", form.handle.as_str()),
            ("variant_id", form.variant_id.as_str()),
        ],
    );

    Ok(Json(state.drawer().view()))
}

pub async fn shop_update(
    State(state): State<AppState>,
    Json(form): Json<ShopUpdateForm>,
) -> Json<DrawerView> {
    state
        .drawer()
        .shop()
        .update_quantity(&form.variant_id, form.quantity);
    Json(state.drawer().view())
}

pub async fn shop_remove(
    State(state): State<AppState>,
    Json(form): Json<ShopRemoveForm>,
) -> Json<DrawerView> {
    state.drawer().remove_shop(&form.variant_id);
    Json(state.drawer().view())
}

pub async fn shop_clear(State(state): State<AppState>) -> Json<DrawerView> {
    state.drawer().shop().clear_cart();
    Json(state.drawer().view())
}

/// Start a hosted checkout for the storefront cart.
///
/// Responds 409 while another checkout is in flight and 502 when the
/// storefront fails; the outcome body carries the notification either way.
#[instrument(skip(state))]
pub async fn shop_checkout(State(state): State<AppState>) -> (StatusCode, Json<CheckoutOutcome>) {
    let outcome = state.drawer().checkout_shop().await;

    let status = match &outcome {
        CheckoutOutcome::Failed {
            reason: CheckoutFailure::InProgress,
            ..
        } => StatusCode::CONFLICT,
        CheckoutOutcome::Failed {
            reason: CheckoutFailure::Remote,
            ..
        } => StatusCode::BAD_GATEWAY,
        CheckoutOutcome::Skipped | CheckoutOutcome::Opened { .. } => StatusCode::OK,
    };

    if let CheckoutOutcome::Opened { .. } = &outcome {
        add_breadcrumb("checkout", "Opened storefront checkout", &[]);
    }

    (status, Json(outcome))
}

// =============================================================================
// Product cart
// =============================================================================

/// Add one unit of a product in a size.
pub async fn product_add(
    State(state): State<AppState>,
    Json(form): Json<LocalCartItemInput>,
) -> Result<Json<DrawerView>> {
    if form.price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }
    if form.price > MAX_UNIT_PRICE {
        return Err(AppError::BadRequest(format!(
            "price must not exceed {MAX_UNIT_PRICE}"
        )));
    }

    state.drawer().products().add_item(form);
    Ok(Json(state.drawer().view()))
}

pub async fn product_update(
    State(state): State<AppState>,
    Json(form): Json<ProductUpdateForm>,
) -> Json<DrawerView> {
    state
        .drawer()
        .products()
        .update_quantity(&form.id, &form.size, form.quantity);
    Json(state.drawer().view())
}

pub async fn product_remove(
    State(state): State<AppState>,
    Json(form): Json<ProductRemoveForm>,
) -> Json<DrawerView> {
    state.drawer().remove_product(&form.id, &form.size);
    Json(state.drawer().view())
}

pub async fn product_clear(State(state): State<AppState>) -> Json<DrawerView> {
    state.drawer().products().clear_cart();
    Json(state.drawer().view())
}

/// Product checkout is not available yet; answers with an informational notification.
pub async fn product_checkout(State(state): State<AppState>) -> Json<Notification> {
    Json(state.drawer().checkout_products())
}
