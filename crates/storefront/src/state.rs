//! Application state shared across handlers.

use std::sync::Arc;

use crate::cart::{CartDrawer, CartStorage, LocalCartStore, RemoteCartStore};
use crate::config::StorefrontConfig;
use crate::shopify::StorefrontClient;

/// Drawer over the two carts, checking out through the live storefront.
pub type StorefrontDrawer = CartDrawer<StorefrontClient>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The cart stores are owned
/// here, at the application root, and reached by handlers through the drawer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    storefront: StorefrontClient,
    drawer: StorefrontDrawer,
}

impl AppState {
    /// Create a new application state, restoring both carts from `storage`.
    ///
    /// Only the cart settings of `config` are kept, inside the drawer.
    #[must_use]
    pub fn new(
        config: &StorefrontConfig,
        storefront: StorefrontClient,
        storage: Arc<dyn CartStorage>,
    ) -> Self {
        let shop = Arc::new(RemoteCartStore::load(storage.clone(), storefront.clone()));
        let products = Arc::new(LocalCartStore::load(storage));
        let drawer = CartDrawer::new(
            shop,
            products,
            config.cart.checkout_policy,
            config.cart.default_currency,
        );

        Self {
            inner: Arc::new(AppStateInner {
                storefront,
                drawer,
            }),
        }
    }

    /// Get a reference to the Shopify Storefront API client.
    #[must_use]
    pub fn storefront(&self) -> &StorefrontClient {
        &self.inner.storefront
    }

    /// Get a reference to the cart drawer.
    #[must_use]
    pub fn drawer(&self) -> &StorefrontDrawer {
        &self.inner.drawer
    }
}
