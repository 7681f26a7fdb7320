//! Shopify Storefront API client.
//!
//! # Architecture
//!
//! - `graphql_client` request/response envelopes, `reqwest` for HTTP
//! - Shopify is source of truth for the catalog - NO local sync, direct API calls
//! - In-memory caching via `moka` for product lookups (5 minute TTL by default)
//! - Checkout sessions are created on demand and never cached
//!
//! # Example
//!
//! ```rust,ignore
//! use kimba_storefront::shopify::{CheckoutLineInput, StorefrontClient};
//!
//! let client = StorefrontClient::new(&config.shopify);
//!
//! let product = client.get_product_by_handle("salmon-kibble").await?;
//! let session = client
//!     .create_checkout(&[CheckoutLineInput {
//!         merchandise_id: product.variants[0].id.clone(),
//!         quantity: 2,
//!     }])
//!     .await?;
//! println!("{}", session.checkout_url);
//! ```

mod storefront;
pub mod types;

use std::future::Future;

pub use storefront::StorefrontClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Storefront API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response contained a value we cannot represent (bad amount, unknown currency, bad URL).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

/// A GraphQL error returned by the Shopify API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    /// An error with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

/// Creates hosted checkout sessions for a list of cart lines.
///
/// The storefront cart store only depends on this seam, so it can be driven
/// by the real [`StorefrontClient`] or by a test double.
pub trait CheckoutProvider: Send + Sync {
    /// Create a checkout session for `lines`.
    fn create_checkout(
        &self,
        lines: &[CheckoutLineInput],
    ) -> impl Future<Output = Result<CheckoutSession, ShopifyError>> + Send;
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
