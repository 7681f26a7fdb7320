//! Integration tests for the cart drawer API.
//!
//! Each test gets its own mock storefront and cart directory.

use axum::http::{Method, StatusCode};
use kimba_integration_tests::{TestContext, product_json, send};
use kimba_storefront::cart::CheckoutPolicy;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, ResponseTemplate};

const HANDLE: &str = "salmon-kibble";
const VARIANT: &str = "gid://shopify/ProductVariant/11";

async fn add_shop_item(ctx: &TestContext, quantity: u32) -> Value {
    let response = ctx
        .post(
            "/api/cart/shop/add",
            json!({ "handle": HANDLE, "variant_id": VARIANT, "quantity": quantity }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.body
}

async fn add_product(ctx: &TestContext, id: &str, size: &str, price: Value) -> Value {
    let response = ctx
        .post(
            "/api/cart/products/add",
            json!({
                "id": id,
                "name": "Pawprint Hoodie",
                "price": price,
                "image": "/images/hoodie.png",
                "category": "apparel",
                "size": size
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.body
}

// =============================================================================
// Drawer
// =============================================================================

#[tokio::test]
async fn test_empty_drawer() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/api/cart").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.body["is_open"], false);
    assert_eq!(response.body["checkout_in_progress"], false);
    assert_eq!(response.body["summary"]["total_items"], 0);
    assert_eq!(response.body["summary"]["total_price_display"], "$0.00");
}

#[tokio::test]
async fn test_panel_toggle() {
    let ctx = TestContext::new().await;

    let response = ctx.post("/api/cart/panel", json!({ "open": true })).await;
    assert_eq!(response.body["is_open"], true);

    let response = ctx.post("/api/cart/panel", json!({ "open": false })).await;
    assert_eq!(response.body["is_open"], false);
}

#[tokio::test]
async fn test_combined_totals() {
    let ctx = TestContext::new().await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;

    add_shop_item(&ctx, 2).await;
    add_shop_item(&ctx, 1).await;
    add_product(&ctx, "p1", "M", json!(20)).await;
    let view = add_product(&ctx, "p1", "L", json!("20.00")).await;

    let summary = &view["summary"];
    assert_eq!(summary["shop_total_items"], 3);
    assert_eq!(summary["product_total_items"], 2);
    assert_eq!(summary["total_items"], 5);
    assert_eq!(summary["total_price_display"], "$70.00");
    assert_eq!(summary["total_price"]["currency_code"], "USD");
}

// =============================================================================
// Storefront cart
// =============================================================================

#[tokio::test]
async fn test_shop_add_merges_by_variant() {
    let ctx = TestContext::new().await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;

    add_shop_item(&ctx, 2).await;
    let view = add_shop_item(&ctx, 1).await;

    let items = view["shop_items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["variant_id"], VARIANT);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[0]["variant_title"], "2kg");
    assert_eq!(items[0]["product"]["handle"], HANDLE);
    assert_eq!(items[0]["selected_options"][0]["value"], "2kg");
    assert_eq!(view["summary"]["total_price_display"], "$30.00");
}

#[tokio::test]
async fn test_shop_add_unknown_variant() {
    let ctx = TestContext::new().await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;

    let response = ctx
        .post(
            "/api/cart/shop/add",
            json!({ "handle": HANDLE, "variant_id": "gid://shopify/ProductVariant/404" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(ctx.get("/api/cart").await.body["shop_items"]
        .as_array()
        .expect("items array")
        .is_empty());
}

#[tokio::test]
async fn test_shop_add_refetches_for_new_variant() {
    let ctx = TestContext::new().await;
    let new_variant = "gid://shopify/ProductVariant/12";
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "operationName": "GetProductByHandle" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "productByHandle": product_json(HANDLE, VARIANT, "10.00") }
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&ctx.server)
        .await;
    ctx.mock_product(HANDLE, new_variant, "12.00").await;

    add_shop_item(&ctx, 1).await;
    let view = ctx
        .post(
            "/api/cart/shop/add",
            json!({ "handle": HANDLE, "variant_id": new_variant }),
        )
        .await;

    assert_eq!(view.status, StatusCode::OK, "{:?}", view.body);
    let items = view.body["shop_items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["variant_id"], new_variant);
}

#[tokio::test]
async fn test_shop_add_in_other_currency() {
    let ctx = TestContext::new().await;
    let mut product = product_json(HANDLE, VARIANT, "45.50");
    product["priceRange"]["minVariantPrice"]["currencyCode"] = json!("NZD");
    product["priceRange"]["maxVariantPrice"]["currencyCode"] = json!("NZD");
    product["variants"]["edges"][0]["node"]["price"]["currencyCode"] = json!("NZD");
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "productByHandle": product } })),
        )
        .mount(&ctx.server)
        .await;

    let view = add_shop_item(&ctx, 2).await;

    assert_eq!(view["shop_items"][0]["price"]["currency_code"], "NZD");
    assert_eq!(view["summary"]["total_price"]["currency_code"], "NZD");
    assert_eq!(view["summary"]["total_price_display"], "NZD 91.00");
}

#[tokio::test]
async fn test_shop_update_to_zero_removes() {
    let ctx = TestContext::new().await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;
    add_shop_item(&ctx, 2).await;

    let view = ctx
        .post(
            "/api/cart/shop/update",
            json!({ "variant_id": VARIANT, "quantity": 0 }),
        )
        .await
        .body;

    assert!(view["shop_items"].as_array().expect("items").is_empty());
}

#[tokio::test]
async fn test_shop_remove_missing_is_noop() {
    let ctx = TestContext::new().await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;
    let before = add_shop_item(&ctx, 2).await;

    let after = ctx
        .post("/api/cart/shop/remove", json!({ "variant_id": "nope" }))
        .await;

    assert_eq!(after.status, StatusCode::OK);
    assert_eq!(after.body["shop_items"], before["shop_items"]);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_empty_cart_skips_storefront() {
    let ctx = TestContext::new().await;
    ctx.mock_checkout(0).await;

    let response = ctx.post_empty("/api/cart/shop/checkout").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "skipped");
}

#[tokio::test]
async fn test_checkout_opens_and_keeps_cart() {
    let ctx = TestContext::new().await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;
    ctx.mock_checkout(1).await;
    add_shop_item(&ctx, 2).await;
    ctx.post("/api/cart/panel", json!({ "open": true })).await;

    let response = ctx.post_empty("/api/cart/shop/checkout").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "opened");
    assert_eq!(
        response.body["checkout_url"],
        "https://kimba-test.myshopify.com/cart/c/c1?key=k&channel=online_store"
    );
    assert_eq!(response.body["notification"]["level"], "success");

    let view = ctx.get("/api/cart").await.body;
    assert_eq!(view["is_open"], false);
    assert_eq!(view["checkout_in_progress"], false);
    assert_eq!(view["checkout_url"], response.body["checkout_url"]);
    assert_eq!(view["shop_items"].as_array().expect("items").len(), 1);
}

#[tokio::test]
async fn test_checkout_clears_cart_when_configured() {
    let ctx = TestContext::with_policy(CheckoutPolicy {
        clear_on_success: true,
    })
    .await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;
    ctx.mock_checkout(1).await;
    add_shop_item(&ctx, 1).await;

    let response = ctx.post_empty("/api/cart/shop/checkout").await;

    assert_eq!(response.body["status"], "opened");
    let view = ctx.get("/api/cart").await.body;
    assert!(view["shop_items"].as_array().expect("items").is_empty());
    assert_eq!(view["checkout_url"], Value::Null);
}

#[tokio::test]
async fn test_checkout_failure_keeps_cart() {
    let ctx = TestContext::new().await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "operationName": "CreateCheckoutCart" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&ctx.server)
        .await;
    add_shop_item(&ctx, 2).await;

    let response = ctx.post_empty("/api/cart/shop/checkout").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["status"], "failed");
    assert_eq!(response.body["reason"], "remote");
    assert_eq!(response.body["notification"]["level"], "error");

    let view = ctx.get("/api/cart").await.body;
    assert_eq!(view["checkout_in_progress"], false);
    assert_eq!(view["shop_items"][0]["quantity"], 2);
}

// =============================================================================
// Product cart
// =============================================================================

#[tokio::test]
async fn test_product_sizes_are_independent() {
    let ctx = TestContext::new().await;

    add_product(&ctx, "p1", "M", json!(20)).await;
    let view = add_product(&ctx, "p1", "L", json!(20)).await;
    assert_eq!(view["summary"]["product_total_items"], 2);

    let view = ctx
        .post(
            "/api/cart/products/update",
            json!({ "id": "p1", "size": "M", "quantity": 0 }),
        )
        .await
        .body;

    let items = view["product_items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["size"], "L");
}

#[tokio::test]
async fn test_product_add_rejects_negative_price() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post(
            "/api/cart/products/add",
            json!({
                "id": "p1",
                "name": "Hoodie",
                "price": "-1.00",
                "image": "",
                "category": "apparel",
                "size": "M"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_add_rejects_oversized_price() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post(
            "/api/cart/products/add",
            json!({
                "id": "p1",
                "name": "Hoodie",
                "price": "10000000000000000000000000000",
                "image": "",
                "category": "apparel",
                "size": "M"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(ctx.get("/api/cart").await.body["product_items"]
        .as_array()
        .expect("items")
        .is_empty());
}

#[tokio::test]
async fn test_huge_quantity_keeps_drawer_readable() {
    let ctx = TestContext::new().await;
    add_product(&ctx, "p1", "M", json!("1000000")).await;

    let response = ctx
        .post(
            "/api/cart/products/update",
            json!({ "id": "p1", "size": "M", "quantity": 4_294_967_295_u64 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let restarted = ctx.restart();
    let view = send(&restarted, Method::GET, "/api/cart", None).await;
    assert_eq!(view.status, StatusCode::OK);
    assert_eq!(view.body["summary"]["product_total_items"], 4_294_967_295_u64);
}

#[tokio::test]
async fn test_product_checkout_is_coming_soon() {
    let ctx = TestContext::new().await;
    add_product(&ctx, "p1", "M", json!(20)).await;

    let response = ctx.post_empty("/api/cart/products/checkout").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["level"], "info");
    assert_eq!(response.body["title"], "Coming soon");
    assert_eq!(
        ctx.get("/api/cart").await.body["summary"]["product_total_items"],
        1
    );
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_carts_survive_restart() {
    let ctx = TestContext::new().await;
    ctx.mock_product(HANDLE, VARIANT, "10.00").await;
    add_shop_item(&ctx, 2).await;
    add_product(&ctx, "p1", "M", json!(20)).await;

    assert!(ctx.cart_dir.path().join("shopify-cart.json").exists());
    assert!(ctx.cart_dir.path().join("product-cart.json").exists());

    let restarted = ctx.restart();
    let view = send(&restarted, Method::GET, "/api/cart", None).await.body;

    assert_eq!(view["shop_items"][0]["quantity"], 2);
    assert_eq!(view["product_items"][0]["size"], "M");
    assert_eq!(view["summary"]["total_items"], 3);
}

#[tokio::test]
async fn test_clear_persists() {
    let ctx = TestContext::new().await;
    add_product(&ctx, "p1", "M", json!(20)).await;

    ctx.post_empty("/api/cart/products/clear").await;

    let restarted = ctx.restart();
    let view = send(&restarted, Method::GET, "/api/cart", None).await.body;
    assert!(view["product_items"].as_array().expect("items").is_empty());
}
