//! Shopper carts.
//!
//! Two independent carts live side by side:
//!
//! - [`RemoteCartStore`]: storefront line items keyed by variant, with hosted checkout
//! - [`LocalCartStore`]: apparel items keyed by (product id, size)
//!
//! Each store persists its whole state to its own [`CartStorage`] namespace
//! after every change and publishes changes through a `watch` channel.
//! [`CartDrawer`] aggregates both for display.

pub mod drawer;
pub mod local;
mod observable;
pub mod remote;
pub mod storage;

pub use drawer::{
    CartDrawer, CartSummary, CheckoutFailure, CheckoutOutcome, DrawerView, Notification,
    NotificationLevel,
};
pub use local::{LOCAL_CART_NAMESPACE, LocalCartItem, LocalCartItemInput, LocalCartStore};
pub use remote::{
    REMOTE_CART_NAMESPACE, ProductSnapshot, RemoteCartLineItem, RemoteCartState, RemoteCartStore,
};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};

use thiserror::Error;

use crate::shopify::ShopifyError;

/// Errors returned by cart operations that reach the storefront.
#[derive(Debug, Error)]
pub enum CartError {
    /// The storefront could not create a checkout.
    #[error("Checkout failed: {0}")]
    Checkout(#[from] ShopifyError),

    /// A checkout for this cart is already in flight.
    #[error("A checkout is already in progress")]
    CheckoutInProgress,
}

/// What happens to the storefront cart after a checkout opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckoutPolicy {
    /// Empty the storefront cart once a checkout URL is obtained.
    pub clear_on_success: bool,
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};

    use kimba_core::{CartId, CurrencyCode, LocalProductId, Money, ProductId, VariantId};
    use rust_decimal::Decimal;
    use tokio::sync::Notify;

    use super::{LocalCartItemInput, RemoteCartLineItem};
    use crate::shopify::{
        CheckoutLineInput, CheckoutProvider, CheckoutSession, PriceRange, Product,
        ProductVariant, SelectedOption, ShopifyError,
    };

    fn session(call: usize) -> CheckoutSession {
        CheckoutSession {
            cart_id: CartId::new(format!("gid://shopify/Cart/c{call}")),
            checkout_url: format!(
                "https://kimba.myshopify.com/cart/c/c{call}?channel=online_store"
            ),
        }
    }

    pub fn product(handle: &str, variants: Vec<ProductVariant>) -> Product {
        let price = variants
            .first()
            .map_or_else(|| Money::zero(CurrencyCode::USD), |v| v.price);
        Product {
            id: ProductId::new(format!("gid://shopify/Product/{handle}")),
            handle: handle.to_string(),
            title: format!("Product {handle}"),
            description: String::new(),
            available_for_sale: true,
            price_range: PriceRange {
                min_variant_price: price,
                max_variant_price: price,
            },
            images: vec![],
            options: vec![],
            variants,
        }
    }

    pub fn variant(id: &str, price: &str) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            title: "Default Title".to_string(),
            price: Money::parse(price, "USD").unwrap_or_else(|e| panic!("{e}")),
            available_for_sale: true,
            selected_options: vec![SelectedOption {
                name: "Size".to_string(),
                value: "Regular".to_string(),
            }],
        }
    }

    pub fn line_item(variant_id: &str, price: &str, quantity: u32) -> RemoteCartLineItem {
        let variant = variant(variant_id, price);
        let product = product("salmon-kibble", vec![variant.clone()]);
        RemoteCartLineItem::from_variant(&product, &variant, quantity)
    }

    pub fn local_input(id: &str, size: &str, price: &str) -> LocalCartItemInput {
        LocalCartItemInput {
            id: LocalProductId::new(id),
            name: format!("Hoodie {id}"),
            price: Decimal::from_str(price).unwrap_or_else(|e| panic!("{e}")),
            image: format!("/images/{id}.png"),
            category: "apparel".to_string(),
            size: size.to_string(),
        }
    }

    /// Provider that answers immediately, recording what it was sent.
    pub struct FakeCheckout {
        calls: AtomicUsize,
        last_lines: Mutex<Vec<CheckoutLineInput>>,
        failure: Option<fn() -> ShopifyError>,
    }

    impl FakeCheckout {
        pub fn succeeding() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_lines: Mutex::new(vec![]),
                failure: None,
            }
        }

        pub fn failing(failure: fn() -> ShopifyError) -> Self {
            Self {
                failure: Some(failure),
                ..Self::succeeding()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_lines(&self) -> Vec<CheckoutLineInput> {
            self.last_lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl CheckoutProvider for FakeCheckout {
        async fn create_checkout(
            &self,
            lines: &[CheckoutLineInput],
        ) -> Result<CheckoutSession, ShopifyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            *self
                .last_lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = lines.to_vec();

            match self.failure {
                Some(failure) => Err(failure()),
                None => Ok(session(call)),
            }
        }
    }

    /// Provider that blocks until [`GatedCheckout::release`] is called.
    #[derive(Clone)]
    pub struct GatedCheckout {
        gate: Arc<Notify>,
        calls: Arc<AtomicUsize>,
    }

    impl GatedCheckout {
        pub fn new() -> Self {
            Self {
                gate: Arc::new(Notify::new()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn release(&self) {
            self.gate.notify_one();
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CheckoutProvider for GatedCheckout {
        async fn create_checkout(
            &self,
            _lines: &[CheckoutLineInput],
        ) -> Result<CheckoutSession, ShopifyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.gate.notified().await;
            Ok(session(call))
        }
    }
}
