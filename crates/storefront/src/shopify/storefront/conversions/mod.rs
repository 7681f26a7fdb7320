//! Type conversion functions for Shopify Storefront API responses.

pub mod cart;
pub mod products;

pub use cart::{convert_checkout, convert_user_errors};
pub use products::{convert_product, convert_products};
