//! Cart drawer: the read-and-dispatch surface over both carts.
//!
//! The drawer never owns line items. It aggregates counts and totals across
//! the two independently persisted stores, tracks whether the panel is open,
//! and turns checkout results into user-facing notifications.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kimba_core::{CurrencyCode, LocalProductId, Money, VariantId};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::local::{LocalCartItem, LocalCartState, LocalCartStore};
use super::remote::{RemoteCartLineItem, RemoteCartState, RemoteCartStore};
use super::{CartError, CheckoutPolicy};
use crate::shopify::CheckoutProvider;

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

/// A toast-style message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    fn new(level: NotificationLevel, title: &str, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            description: description.into(),
        }
    }
}

// =============================================================================
// Views
// =============================================================================

/// Badge counts and combined total across both carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub shop_total_items: u32,
    pub product_total_items: u32,
    pub total_items: u32,
    pub total_price: Money,
    pub total_price_display: String,
}

/// Everything needed to render the drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawerView {
    pub is_open: bool,
    pub checkout_in_progress: bool,
    pub checkout_url: Option<String>,
    pub shop_items: Vec<RemoteCartLineItem>,
    pub product_items: Vec<LocalCartItem>,
    pub summary: CartSummary,
}

/// Why a storefront checkout did not open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutFailure {
    /// Another checkout for this cart has not settled yet.
    InProgress,
    /// The storefront rejected or failed the request.
    Remote,
}

/// Result of a storefront checkout action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// The cart was empty; nothing was requested.
    Skipped,
    /// A hosted checkout is ready at `checkout_url`.
    Opened {
        checkout_url: String,
        notification: Notification,
    },
    Failed {
        reason: CheckoutFailure,
        notification: Notification,
    },
}

// =============================================================================
// CartDrawer
// =============================================================================

pub struct CartDrawer<C> {
    shop: Arc<RemoteCartStore<C>>,
    products: Arc<LocalCartStore>,
    policy: CheckoutPolicy,
    default_currency: CurrencyCode,
    open: AtomicBool,
}

impl<C: CheckoutProvider> CartDrawer<C> {
    #[must_use]
    pub fn new(
        shop: Arc<RemoteCartStore<C>>,
        products: Arc<LocalCartStore>,
        policy: CheckoutPolicy,
        default_currency: CurrencyCode,
    ) -> Self {
        Self {
            shop,
            products,
            policy,
            default_currency,
            open: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn shop(&self) -> &RemoteCartStore<C> {
        &self.shop
    }

    #[must_use]
    pub fn products(&self) -> &LocalCartStore {
        &self.products
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }

    pub fn open(&self) {
        self.set_open(true);
    }

    pub fn close(&self) {
        self.set_open(false);
    }

    /// Aggregate counts and total price across both carts.
    ///
    /// Storefront line amounts and local prices are summed as decimals. The
    /// total is labelled with the storefront cart's currency when it has
    /// items, otherwise with the configured default currency.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        self.summarize(&self.shop.snapshot(), &self.products.snapshot())
    }

    /// Drawer contents, with the summary computed from the same snapshots.
    #[must_use]
    pub fn view(&self) -> DrawerView {
        let shop = self.shop.snapshot();
        let products = self.products.snapshot();
        let summary = self.summarize(&shop, &products);

        DrawerView {
            is_open: self.is_open(),
            checkout_in_progress: shop.is_loading,
            checkout_url: shop.checkout_url,
            shop_items: shop.items,
            product_items: products.items,
            summary,
        }
    }

    fn summarize(&self, shop: &RemoteCartState, products: &LocalCartState) -> CartSummary {
        let shop_total_items = shop.total_items();
        let product_total_items = products.total_items();
        let currency = shop.currency().unwrap_or(self.default_currency);
        let total_price = Money::new(
            shop.total_amount().saturating_add(products.total_price()),
            currency,
        );

        CartSummary {
            shop_total_items,
            product_total_items,
            total_items: shop_total_items.saturating_add(product_total_items),
            total_price_display: total_price.display(),
            total_price,
        }
    }

    /// Start a hosted checkout for the storefront cart.
    ///
    /// On success the session's URL is returned, the panel closes, and
    /// the cart is cleared only if the policy asks for it. On failure the
    /// cart is left as it was.
    #[instrument(skip(self))]
    pub async fn checkout_shop(&self) -> CheckoutOutcome {
        match self.shop.create_checkout().await {
            Ok(None) => CheckoutOutcome::Skipped,
            Ok(Some(session)) => {
                let checkout_url = session.checkout_url;
                self.close();
                if self.policy.clear_on_success {
                    info!("Clearing storefront cart after checkout");
                    self.shop.clear_cart();
                }

                CheckoutOutcome::Opened {
                    checkout_url,
                    notification: Notification::new(
                        NotificationLevel::Success,
                        "Redirecting to checkout",
                        "Your checkout has opened in a new window.",
                    ),
                }
            }
            Err(CartError::CheckoutInProgress) => CheckoutOutcome::Failed {
                reason: CheckoutFailure::InProgress,
                notification: Notification::new(
                    NotificationLevel::Info,
                    "Checkout in progress",
                    "Please wait for the current checkout to finish.",
                ),
            },
            Err(e) => {
                warn!(error = %e, "Storefront checkout failed");
                CheckoutOutcome::Failed {
                    reason: CheckoutFailure::Remote,
                    notification: Notification::new(
                        NotificationLevel::Error,
                        "Checkout failed",
                        "We couldn't start checkout. Please try again.",
                    ),
                }
            }
        }
    }

    /// Checkout for the local product cart is not available yet.
    #[must_use]
    pub fn checkout_products(&self) -> Notification {
        Notification::new(
            NotificationLevel::Info,
            "Coming soon",
            "Checkout for these products will be available soon.",
        )
    }

    pub fn increment_shop(&self, variant_id: &VariantId) {
        self.shop.adjust_quantity(variant_id, 1);
    }

    pub fn decrement_shop(&self, variant_id: &VariantId) {
        self.shop.adjust_quantity(variant_id, -1);
    }

    pub fn remove_shop(&self, variant_id: &VariantId) {
        self.shop.remove_item(variant_id);
    }

    pub fn increment_product(&self, id: &LocalProductId, size: &str) {
        self.products.adjust_quantity(id, size, 1);
    }

    pub fn decrement_product(&self, id: &LocalProductId, size: &str) {
        self.products.adjust_quantity(id, size, -1);
    }

    pub fn remove_product(&self, id: &LocalProductId, size: &str) {
        self.products.remove_item(id, size);
    }
}
