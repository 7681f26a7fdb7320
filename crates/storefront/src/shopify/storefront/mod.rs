//! Shopify Storefront API client implementation.
//!
//! Uses `graphql_client` envelopes with `reqwest` 0.13 for HTTP.
//! Caches product lookups using `moka` (TTL from configuration).

mod cache;
mod conversions;

pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use moka::future::Cache;
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::{CheckoutLineInput, CheckoutSession, Product};
use crate::shopify::{CheckoutProvider, GraphQLError, GraphQLErrorLocation, ShopifyError};

use cache::{CacheKey, CacheValue};
use conversions::{convert_checkout, convert_product, convert_products, convert_user_errors};
use queries::{
    CreateCheckoutCart, GetProductByHandle, GetProducts, create_checkout_cart,
    get_product_by_handle, get_products,
};

/// Default number of products returned by a listing.
pub const DEFAULT_PRODUCT_COUNT: i64 = 20;

/// Largest page the Storefront API serves.
pub const MAX_PRODUCT_COUNT: i64 = 250;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Storefront-Access-Token";

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Provides type-safe access to products and checkout creation.
/// Product lookups are cached.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        Self::with_endpoint(
            config.endpoint(),
            config.storefront_token.expose_secret(),
            config.product_cache_ttl,
        )
    }

    /// Create a client against an explicit GraphQL endpoint.
    #[must_use]
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        access_token: &str,
        cache_ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .build();

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint: endpoint.into(),
                access_token: access_token.to_string(),
                cache,
            }),
        }
    }

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header(ACCESS_TOKEN_HEADER, &self.inner.access_token)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&response_text, 500),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                excerpt(&response_text, 200)
            ))]));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %excerpt(&response_text, 500),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, "GraphQL errors in response");

            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                body = %excerpt(&response_text, 500),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        let cache_key = CacheKey::Product(handle.to_string());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let variables = get_product_by_handle::Variables {
            handle: handle.to_string(),
        };

        let data = self.execute::<GetProductByHandle>(variables).await?;

        let product_data = data
            .product_by_handle
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        let product = convert_product(product_data)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a bounded list of products.
    ///
    /// `first` defaults to [`DEFAULT_PRODUCT_COUNT`] and is clamped to
    /// `1..=MAX_PRODUCT_COUNT`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, first: Option<i64>) -> Result<Vec<Product>, ShopifyError> {
        let first = first
            .unwrap_or(DEFAULT_PRODUCT_COUNT)
            .clamp(1, MAX_PRODUCT_COUNT);
        let cache_key = CacheKey::Products { first };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let data = self
            .execute::<GetProducts>(get_products::Variables { first })
            .await?;

        let products = convert_products(data.products.edges.into_iter().map(|e| e.node));

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    // =========================================================================
    // Checkout (not cached - mutable state)
    // =========================================================================

    /// Create a remote cart holding `lines` and return its hosted checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn create_checkout(
        &self,
        lines: &[CheckoutLineInput],
    ) -> Result<CheckoutSession, ShopifyError> {
        let variables = create_checkout_cart::Variables {
            input: create_checkout_cart::CartInput {
                lines: lines
                    .iter()
                    .map(|line| create_checkout_cart::CartLineInput {
                        merchandise_id: line.merchandise_id.to_string(),
                        quantity: i64::from(line.quantity),
                    })
                    .collect(),
            },
        };

        let data = self.execute::<CreateCheckoutCart>(variables).await?;

        if let Some(result) = data.cart_create {
            if !result.user_errors.is_empty() {
                return Err(ShopifyError::UserError(convert_user_errors(
                    result.user_errors,
                )));
            }

            if let Some(cart) = result.cart {
                let session = convert_checkout(cart)?;
                debug!(cart_id = %session.cart_id, "Checkout cart created");
                return Ok(session);
            }
        }

        Err(ShopifyError::GraphQL(vec![GraphQLError::message(
            "Failed to create checkout cart",
        )]))
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, handle: &str) {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(handle.to_string()))
            .await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

impl CheckoutProvider for StorefrontClient {
    async fn create_checkout(
        &self,
        lines: &[CheckoutLineInput],
    ) -> Result<CheckoutSession, ShopifyError> {
        Self::create_checkout(self, lines).await
    }
}

fn convert_graphql_error(e: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}

/// First `max` characters of a response body, for logs and error messages.
fn excerpt(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}
