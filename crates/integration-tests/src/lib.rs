//! Integration tests for the Kimba Petverse cart service.
//!
//! Tests drive the real axum router in-process with
//! `tower::ServiceExt::oneshot`; the Shopify Storefront API is replaced by a
//! `wiremock` server and carts are persisted to a temporary directory.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kimba-integration-tests
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use kimba_core::CurrencyCode;
use kimba_storefront::cart::{CartStorage, CheckoutPolicy, FileStorage};
use kimba_storefront::config::{CartConfig, ShopifyStorefrontConfig, StorefrontConfig};
use kimba_storefront::shopify::StorefrontClient;
use kimba_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Storefront access token used by every test client.
pub const TEST_TOKEN: &str = "3f9a1c77e0b24d5e8a6f2b9c4d1e7a03";

/// Largest response body the helpers will read.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A running app wired to a mock storefront and a throwaway cart directory.
pub struct TestContext {
    pub server: MockServer,
    pub app: Router,
    pub cart_dir: TempDir,
    policy: CheckoutPolicy,
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    /// Start with the default checkout policy (cart kept after checkout).
    pub async fn new() -> Self {
        Self::with_policy(CheckoutPolicy::default()).await
    }

    pub async fn with_policy(policy: CheckoutPolicy) -> Self {
        let server = MockServer::start().await;
        let cart_dir = tempfile::tempdir().expect("create cart dir");
        let app = build_app(&server, cart_dir.path(), policy);

        Self {
            server,
            app,
            cart_dir,
            policy,
        }
    }

    /// Build a fresh app over the same cart directory, as after a restart.
    #[must_use]
    pub fn restart(&self) -> Router {
        build_app(&self.server, self.cart_dir.path(), self.policy)
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        send(&self.app, Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        send(&self.app, Method::POST, uri, Some(body)).await
    }

    /// POST without a body.
    pub async fn post_empty(&self, uri: &str) -> TestResponse {
        send(&self.app, Method::POST, uri, None).await
    }

    /// Serve `product_json(handle, ...)` for a lookup of `handle`.
    pub async fn mock_product(&self, handle: &str, variant_id: &str, amount: &str) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "operationName": "GetProductByHandle",
                "variables": { "handle": handle }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "productByHandle": product_json(handle, variant_id, amount) }
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer checkout creation with a hosted checkout URL, expecting `calls` requests.
    pub async fn mock_checkout(&self, calls: u64) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "operationName": "CreateCheckoutCart" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "cartCreate": {
                    "cart": {
                        "id": "gid://shopify/Cart/c1",
                        "checkoutUrl": "https://kimba-test.myshopify.com/cart/c/c1?key=k"
                    },
                    "userErrors": []
                } }
            })))
            .expect(calls)
            .mount(&self.server)
            .await;
    }
}

/// Send a request to `app` and decode the JSON (or text) body.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("call router");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), MAX_BODY_BYTES)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    TestResponse {
        status,
        headers,
        body,
    }
}

/// A Storefront API product node with a single variant.
#[must_use]
pub fn product_json(handle: &str, variant_id: &str, amount: &str) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{handle}"),
        "handle": handle,
        "title": "Salmon Kibble",
        "description": "Grain-free kibble",
        "availableForSale": true,
        "priceRange": {
            "minVariantPrice": { "amount": amount, "currencyCode": "USD" },
            "maxVariantPrice": { "amount": amount, "currencyCode": "USD" }
        },
        "images": { "edges": [{ "node": {
            "url": "https://cdn.shopify.com/kibble.png",
            "altText": "Bag of kibble"
        } }] },
        "options": [{ "name": "Size", "values": ["2kg"] }],
        "variants": { "edges": [{ "node": {
            "id": variant_id,
            "title": "2kg",
            "availableForSale": true,
            "price": { "amount": amount, "currencyCode": "USD" },
            "selectedOptions": [{ "name": "Size", "value": "2kg" }]
        } }] }
    })
}

fn test_config(cart_dir: &Path, policy: CheckoutPolicy) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        cart: CartConfig {
            storage_dir: cart_dir.to_path_buf(),
            default_currency: CurrencyCode::USD,
            checkout_policy: policy,
        },
        shopify: ShopifyStorefrontConfig {
            store: "kimba-test.myshopify.com".to_string(),
            api_version: "2025-07".to_string(),
            storefront_token: SecretString::from(TEST_TOKEN),
            product_cache_ttl: Duration::from_secs(60),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

fn build_app(server: &MockServer, cart_dir: &Path, policy: CheckoutPolicy) -> Router {
    let config = test_config(cart_dir, policy);
    let storefront = StorefrontClient::with_endpoint(
        format!("{}/api/2025-07/graphql.json", server.uri()),
        TEST_TOKEN,
        config.shopify.product_cache_ttl,
    );
    let storage: Arc<dyn CartStorage> = Arc::new(FileStorage::new(cart_dir));

    kimba_storefront::app(AppState::new(&config, storefront, storage))
}
