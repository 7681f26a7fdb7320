//! Domain types for Shopify Storefront API.
//!
//! These types provide a clean, ergonomic API separate from the raw GraphQL
//! response shapes in `storefront::queries`. Prices are parsed into
//! fixed-point [`Money`] during conversion.

use kimba_core::{CartId, Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Money Types
// =============================================================================

/// Price range for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    /// Minimum price among all variants.
    pub min_variant_price: Money,
    /// Maximum price among all variants.
    pub max_variant_price: Money,
}

// =============================================================================
// Image Types
// =============================================================================

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Alt text for accessibility.
    pub alt_text: Option<String>,
}

// =============================================================================
// Product Types
// =============================================================================

/// Selected option on a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name (e.g., "Size", "Flavour").
    pub name: String,
    /// Selected value (e.g., "Large", "Salmon").
    pub value: String,
}

/// Product option definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option name (e.g., "Size").
    pub name: String,
    /// Available values (e.g., `["Small", "Medium", "Large"]`).
    pub values: Vec<String>,
}

/// A product variant (specific combination of options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title (combination of option values).
    pub title: String,
    /// Current price.
    pub price: Money,
    /// Whether this variant is available for sale.
    pub available_for_sale: bool,
    /// Selected options for this variant.
    pub selected_options: Vec<SelectedOption>,
}

/// A product in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// URL handle.
    pub handle: String,
    /// Product title.
    pub title: String,
    /// Plain text description.
    pub description: String,
    /// Whether any variant is available.
    pub available_for_sale: bool,
    /// Price range across variants.
    pub price_range: PriceRange,
    /// Product images.
    pub images: Vec<Image>,
    /// Product options.
    pub options: Vec<ProductOption>,
    /// Product variants.
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Find a variant of this product by ID.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == id)
    }
}

// =============================================================================
// Checkout Types
// =============================================================================

/// Input for one checkout line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLineInput {
    /// Product variant ID.
    pub merchandise_id: VariantId,
    /// Quantity to purchase.
    pub quantity: u32,
}

/// A hosted checkout session created on the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Remote cart backing the session.
    pub cart_id: CartId,
    /// URL of the hosted checkout page.
    pub checkout_url: String,
}
