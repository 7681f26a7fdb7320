//! Local product cart: apparel items keyed by (product id, size).

use std::sync::Arc;

use kimba_core::{LocalProductId, saturating_sum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use super::observable::PersistedState;
use super::storage::CartStorage;

/// Storage namespace of the local product cart.
pub const LOCAL_CART_NAMESPACE: &str = "product-cart";

/// A product as offered to the cart. The cart assigns the quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCartItemInput {
    pub id: LocalProductId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
    pub size: String,
}

/// One local cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCartItem {
    pub id: LocalProductId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
    pub size: String,
    pub quantity: u32,
}

impl LocalCartItem {
    fn matches(&self, id: &LocalProductId, size: &str) -> bool {
        &self.id == id && self.size == size
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

impl From<LocalCartItemInput> for LocalCartItem {
    fn from(input: LocalCartItemInput) -> Self {
        Self {
            id: input.id,
            name: input.name,
            price: input.price,
            image: input.image,
            category: input.category,
            size: input.size,
            quantity: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCartState {
    pub items: Vec<LocalCartItem>,
}

impl LocalCartState {
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    #[must_use]
    pub fn total_price(&self) -> Decimal {
        saturating_sum(self.items.iter().map(LocalCartItem::line_total))
    }
}

/// Persisted, observable local product cart.
pub struct LocalCartStore {
    state: PersistedState<LocalCartState>,
}

impl LocalCartStore {
    /// Restore the cart from `storage` (empty if nothing usable is stored).
    pub fn load(storage: Arc<dyn CartStorage>) -> Self {
        let state: PersistedState<LocalCartState> = PersistedState::load(storage, LOCAL_CART_NAMESPACE);
        debug!(
            items = state.read(|s| s.items.len()),
            "Product cart restored"
        );
        Self { state }
    }

    #[must_use]
    pub fn snapshot(&self) -> LocalCartState {
        self.state.snapshot()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LocalCartState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn items(&self) -> Vec<LocalCartItem> {
        self.state.read(|s| s.items.clone())
    }

    /// Add one unit of `input`. A matching (id, size) line is incremented by exactly 1.
    pub fn add_item(&self, input: LocalCartItemInput) {
        self.state.mutate(|state| {
            match state
                .items
                .iter_mut()
                .find(|item| item.matches(&input.id, &input.size))
            {
                Some(item) => item.quantity = item.quantity.saturating_add(1),
                None => state.items.push(input.into()),
            }
            true
        });
    }

    /// Remove the (id, size) line, if present.
    pub fn remove_item(&self, id: &LocalProductId, size: &str) {
        self.state.mutate(|state| {
            let before = state.items.len();
            state.items.retain(|item| !item.matches(id, size));
            state.items.len() != before
        });
    }

    /// Set the (id, size) line's quantity. Zero or less removes it.
    pub fn update_quantity(&self, id: &LocalProductId, size: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id, size);
            return;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        self.state.mutate(|state| {
            match state.items.iter_mut().find(|item| item.matches(id, size)) {
                Some(item) if item.quantity != quantity => {
                    item.quantity = quantity;
                    true
                }
                _ => false,
            }
        });
    }

    /// Change the (id, size) line's quantity by `delta`; below 1 removes it.
    pub fn adjust_quantity(&self, id: &LocalProductId, size: &str, delta: i64) {
        self.state.mutate(|state| {
            let Some(index) = state.items.iter().position(|item| item.matches(id, size)) else {
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

    pub fn clear_cart(&self) {
        self.state.mutate(|state| {
            let changed = !state.items.is_empty();
            state.items.clear();
            changed
        });
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.state.read(LocalCartState::total_items)
    }

    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.state.read(LocalCartState::total_price)
    }
}
