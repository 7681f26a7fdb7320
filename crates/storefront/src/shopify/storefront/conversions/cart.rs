//! Checkout cart conversion functions.

use kimba_core::CartId;
use url::Url;

use crate::shopify::ShopifyError;
use crate::shopify::types::CheckoutSession;

use super::super::queries::create_checkout_cart::{CartUserError, CreatedCart};

/// Query parameter that pins hosted checkout to the online store channel.
const CHECKOUT_CHANNEL: (&str, &str) = ("channel", "online_store");

/// Append the online store channel to a hosted checkout URL.
///
/// An existing `channel` parameter is replaced rather than duplicated.
///
/// # Errors
///
/// Returns `ShopifyError::InvalidData` if the URL cannot be parsed.
pub fn tag_checkout_url(checkout_url: &str) -> Result<String, ShopifyError> {
    let mut url = Url::parse(checkout_url)
        .map_err(|e| ShopifyError::InvalidData(format!("checkout URL {checkout_url}: {e}")))?;

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != CHECKOUT_CHANNEL.0)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(CHECKOUT_CHANNEL.0, CHECKOUT_CHANNEL.1);

    Ok(url.into())
}

/// Convert the cart returned by `cartCreate` into a checkout session.
///
/// # Errors
///
/// Returns `ShopifyError::InvalidData` if the checkout URL is malformed.
pub fn convert_checkout(cart: CreatedCart) -> Result<CheckoutSession, ShopifyError> {
    Ok(CheckoutSession {
        checkout_url: tag_checkout_url(&cart.checkout_url)?,
        cart_id: CartId::new(cart.id),
    })
}

/// Join mutation user errors into a single message.
pub fn convert_user_errors(errors: Vec<CartUserError>) -> String {
    errors
        .into_iter()
        .map(|e| match e.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
            _ => e.message,
        })
        .collect::<Vec<_>>()
        .join("; ")
}
