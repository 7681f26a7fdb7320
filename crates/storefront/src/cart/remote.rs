//! Storefront cart: line items referencing remote product variants.
//!
//! Line items carry a denormalized snapshot of the product and variant taken
//! when the item was added; they are never re-fetched on read. Checkout hands
//! the full item list to a [`CheckoutProvider`] and records the hosted
//! checkout URL it returns.

use std::sync::Arc;

use kimba_core::{CartId, CurrencyCode, Money, ProductId, VariantId, saturating_sum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use super::CartError;
use super::observable::PersistedState;
use super::storage::CartStorage;
use crate::shopify::{
    CheckoutLineInput, CheckoutProvider, CheckoutSession, Image, PriceRange, Product,
    ProductVariant, SelectedOption,
};

/// Storage namespace of the storefront cart.
pub const REMOTE_CART_NAMESPACE: &str = "shopify-cart";

/// Product fields copied into a line item at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub images: Vec<Image>,
    pub price_range: PriceRange,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            handle: product.handle.clone(),
            title: product.title.clone(),
            description: product.description.clone(),
            images: product.images.clone(),
            price_range: product.price_range.clone(),
        }
    }
}

/// One storefront cart line, keyed by variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCartLineItem {
    pub variant_id: VariantId,
    pub product: ProductSnapshot,
    pub variant_title: String,
    pub price: Money,
    pub selected_options: Vec<SelectedOption>,
    pub quantity: u32,
}

impl RemoteCartLineItem {
    /// Snapshot `variant` of `product` as a line item.
    #[must_use]
    pub fn from_variant(product: &Product, variant: &ProductVariant, quantity: u32) -> Self {
        Self {
            variant_id: variant.id.clone(),
            product: ProductSnapshot::from(product),
            variant_title: variant.title.clone(),
            price: variant.price,
            selected_options: variant.selected_options.clone(),
            quantity,
        }
    }

    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// Everything the storefront cart holds.
///
/// `is_loading` is transient: it is never persisted, so a restored cart is
/// always idle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCartState {
    pub items: Vec<RemoteCartLineItem>,
    pub cart_id: Option<CartId>,
    pub checkout_url: Option<String>,
    #[serde(skip)]
    pub is_loading: bool,
}

impl RemoteCartState {
    /// Sum of all line quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Sum of line totals. Amounts are added as decimals regardless of currency.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        saturating_sum(self.items.iter().map(|item| item.line_total().amount))
    }

    /// Currency of the first line, if any.
    #[must_use]
    pub fn currency(&self) -> Option<CurrencyCode> {
        self.items.first().map(|item| item.price.currency_code)
    }
}

/// Persisted, observable storefront cart.
pub struct RemoteCartStore<C> {
    state: PersistedState<RemoteCartState>,
    provider: C,
}

impl<C: CheckoutProvider> RemoteCartStore<C> {
    /// Restore the cart from `storage` (empty if nothing usable is stored).
    pub fn load(storage: Arc<dyn CartStorage>, provider: C) -> Self {
        let state: PersistedState<RemoteCartState> = PersistedState::load(storage, REMOTE_CART_NAMESPACE);
        debug!(
            items = state.read(|s| s.items.len()),
            "Storefront cart restored"
        );
        Self { state, provider }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> RemoteCartState {
        self.state.snapshot()
    }

    /// Receiver notified after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RemoteCartState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn items(&self) -> Vec<RemoteCartLineItem> {
        self.state.read(|s| s.items.clone())
    }

    #[must_use]
    pub fn checkout_url(&self) -> Option<String> {
        self.state.read(|s| s.checkout_url.clone())
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.read(|s| s.is_loading)
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.state.read(RemoteCartState::total_items)
    }

    /// Sum of line totals, in the first line's currency or `default_currency`
    /// when the cart is empty.
    #[must_use]
    pub fn total_price(&self, default_currency: CurrencyCode) -> Money {
        self.state.read(|state| {
            Money::new(
                state.total_amount(),
                state.currency().unwrap_or(default_currency),
            )
        })
    }

    /// Add a line, merging into an existing line with the same variant.
    ///
    /// A zero quantity is ignored so every stored line keeps quantity >= 1.
    pub fn add_item(&self, item: RemoteCartLineItem) {
        if item.quantity == 0 {
            debug!(variant_id = %item.variant_id, "Ignoring add with zero quantity");
            return;
        }

        self.state.mutate(|state| {
            match state
                .items
                .iter_mut()
                .find(|existing| existing.variant_id == item.variant_id)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => state.items.push(item),
            }
            true
        });
    }

    /// Set a line's quantity. Zero or less removes the line; unknown variants are ignored.
    pub fn update_quantity(&self, variant_id: &VariantId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(variant_id);
            return;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        self.state.mutate(|state| {
            match state
                .items
                .iter_mut()
                .find(|item| &item.variant_id == variant_id)
            {
                Some(item) if item.quantity != quantity => {
                    item.quantity = quantity;
                    true
                }
                _ => false,
            }
        });
    }

    /// Change a line's quantity by `delta`, removing it when the result drops below 1.
    pub fn adjust_quantity(&self, variant_id: &VariantId, delta: i64) {
        self.state.mutate(|state| {
            let Some(index) = state
                .items
                .iter()
                .position(|item| &item.variant_id == variant_id)
            else {
                return false;
            };

            let current = state.items.get(index).map_or(0, |item| i64::from(item.quantity));
            let next = current.saturating_add(delta);
            if next <= 0 {
                state.items.remove(index);
            } else if let Some(item) = state.items.get_mut(index) {
                item.quantity = u32::try_from(next).unwrap_or(u32::MAX);
            }
            true
        });
    }

    /// Remove the line for `variant_id`, if present.
    pub fn remove_item(&self, variant_id: &VariantId) {
        self.state.mutate(|state| {
            let before = state.items.len();
            state.items.retain(|item| &item.variant_id != variant_id);
            state.items.len() != before
        });
    }

    /// Empty the cart and forget the last checkout session.
    pub fn clear_cart(&self) {
        self.state.mutate(|state| {
            let changed =
                !state.items.is_empty() || state.cart_id.is_some() || state.checkout_url.is_some();
            state.items.clear();
            state.cart_id = None;
            state.checkout_url = None;
            changed
        });
    }

    /// Request a hosted checkout for the current items.
    ///
    /// Returns `Ok(None)` without contacting the storefront when the cart is
    /// empty. The returned session is recorded on the cart only if the items
    /// still match the lines that were sent. Only one checkout may be in flight: the emptiness check and the
    /// in-flight flag are set in a single state mutation, and a concurrent call
    /// fails with [`CartError::CheckoutInProgress`]. The loading flag is
    /// cleared when this call settles, including when its future is dropped.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Checkout` if the storefront rejects the request;
    /// the cart is left unchanged.
    #[instrument(skip(self))]
    pub async fn create_checkout(&self) -> Result<Option<CheckoutSession>, CartError> {
        let mut lines = None;
        let mut in_flight = false;

        self.state.mutate_transient(|state| {
            if state.items.is_empty() {
                return false;
            }
            if state.is_loading {
                in_flight = true;
                return false;
            }
            state.is_loading = true;
            lines = Some(
                state
                    .items
                    .iter()
                    .map(|item| CheckoutLineInput {
                        merchandise_id: item.variant_id.clone(),
                        quantity: item.quantity,
                    })
                    .collect::<Vec<_>>(),
            );
            true
        });

        if in_flight {
            debug!("Checkout already in flight");
            return Err(CartError::CheckoutInProgress);
        }
        let Some(lines) = lines else {
            debug!("Checkout skipped for empty cart");
            return Ok(None);
        };

        let _loading = LoadingGuard { state: &self.state };

        match self.provider.create_checkout(&lines).await {
            Ok(session) => {
                let recorded = self.state.mutate(|state| {
                    if !matches_lines(&state.items, &lines) {
                        return false;
                    }
                    state.cart_id = Some(session.cart_id.clone());
                    state.checkout_url = Some(session.checkout_url.clone());
                    true
                });
                if recorded {
                    info!(cart_id = %session.cart_id, "Checkout session created");
                } else {
                    warn!(
                        cart_id = %session.cart_id,
                        "Cart changed during checkout, session not recorded"
                    );
                }
                Ok(Some(session))
            }
            Err(e) => {
                error!(error = %e, "Failed to create checkout session");
                Err(CartError::Checkout(e))
            }
        }
    }
}

/// Whether `items` are exactly the lines a checkout was requested for.
fn matches_lines(items: &[RemoteCartLineItem], lines: &[CheckoutLineInput]) -> bool {
    items.len() == lines.len()
        && items.iter().zip(lines).all(|(item, line)| {
            item.variant_id == line.merchandise_id && item.quantity == line.quantity
        })
}

/// Clears `is_loading` when dropped.
struct LoadingGuard<'a> {
    state: &'a PersistedState<RemoteCartState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.mutate_transient(|state| {
            let was_loading = state.is_loading;
            state.is_loading = false;
            was_loading
        });
    }
}
