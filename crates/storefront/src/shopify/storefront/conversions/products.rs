//! Product type conversion functions.

use kimba_core::{Money, ProductId, VariantId};
use tracing::warn;

use crate::shopify::ShopifyError;
use crate::shopify::types::{
    Image, PriceRange, Product, ProductOption, ProductVariant, SelectedOption,
};

use super::super::queries::{MoneyV2, ProductNode, VariantNode};

/// Parse a `MoneyV2` into fixed-point [`Money`].
///
/// # Errors
///
/// Returns `ShopifyError::InvalidData` for a malformed amount or currency code.
pub fn convert_money(money: &MoneyV2) -> Result<Money, ShopifyError> {
    Money::parse(&money.amount, &money.currency_code)
        .map_err(|e| ShopifyError::InvalidData(e.to_string()))
}

fn convert_variant(node: VariantNode) -> Result<ProductVariant, ShopifyError> {
    Ok(ProductVariant {
        price: convert_money(&node.price)?,
        id: VariantId::new(node.id),
        title: node.title,
        available_for_sale: node.available_for_sale,
        selected_options: node
            .selected_options
            .into_iter()
            .map(|o| SelectedOption {
                name: o.name,
                value: o.value,
            })
            .collect(),
    })
}

/// Convert a product node.
///
/// # Errors
///
/// Returns `ShopifyError::InvalidData` if any price cannot be parsed.
pub fn convert_product(node: ProductNode) -> Result<Product, ShopifyError> {
    let price_range = PriceRange {
        min_variant_price: convert_money(&node.price_range.min_variant_price)?,
        max_variant_price: convert_money(&node.price_range.max_variant_price)?,
    };

    let variants = node
        .variants
        .edges
        .into_iter()
        .map(|edge| convert_variant(edge.node))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Product {
        id: ProductId::new(node.id),
        handle: node.handle,
        title: node.title,
        description: node.description,
        available_for_sale: node.available_for_sale,
        price_range,
        images: node
            .images
            .edges
            .into_iter()
            .map(|edge| Image {
                url: edge.node.url,
                alt_text: edge.node.alt_text,
            })
            .collect(),
        options: node
            .options
            .into_iter()
            .map(|o| ProductOption {
                name: o.name,
                values: o.values,
            })
            .collect(),
        variants,
    })
}

/// Convert a product listing, skipping products whose prices cannot be parsed.
///
/// One malformed product should not blank the whole listing.
pub fn convert_products(nodes: impl IntoIterator<Item = ProductNode>) -> Vec<Product> {
    nodes
        .into_iter()
        .filter_map(|node| {
            let handle = node.handle.clone();
            match convert_product(node) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(handle = %handle, error = %e, "Skipping product with invalid data");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kimba_core::CurrencyCode;
    use rust_decimal::Decimal;

    fn product_node(handle: &str, amount: &str) -> ProductNode {
        serde_json::from_value(serde_json::json!({
            "id": format!("gid://shopify/Product/{handle}"),
            "handle": handle,
            "title": "Salmon Kibble",
            "description": "Grain-free kibble",
            "availableForSale": true,
            "priceRange": {
                "minVariantPrice": { "amount": amount, "currencyCode": "USD" },
                "maxVariantPrice": { "amount": amount, "currencyCode": "USD" }
            },
            "images": { "edges": [{ "node": { "url": "https://cdn.example/k.png", "altText": null } }] },
            "options": [{ "name": "Size", "values": ["2kg"] }],
            "variants": { "edges": [{ "node": {
                "id": "gid://shopify/ProductVariant/1",
                "title": "2kg",
                "availableForSale": true,
                "price": { "amount": amount, "currencyCode": "USD" },
                "selectedOptions": [{ "name": "Size", "value": "2kg" }]
            } }] }
        }))
        .expect("valid product node")
    }

    #[test]
    fn test_convert_product() {
        let product = convert_product(product_node("salmon-kibble", "10.00")).expect("convert");

        assert_eq!(product.handle, "salmon-kibble");
        assert_eq!(product.images.len(), 1);
        assert_eq!(product.variants.len(), 1);

        let variant = &product.variants[0];
        assert_eq!(variant.id.as_str(), "gid://shopify/ProductVariant/1");
        assert_eq!(variant.price.amount, Decimal::new(1000, 2));
        assert_eq!(variant.price.currency_code, CurrencyCode::USD);
        assert_eq!(variant.selected_options[0].value, "2kg");
    }

    #[test]
    fn test_convert_product_rejects_bad_amount() {
        let err = convert_product(product_node("broken", "n/a")).unwrap_err();
        assert!(matches!(err, ShopifyError::InvalidData(_)));
    }

    #[test]
    fn test_convert_products_skips_invalid() {
        let products = convert_products(vec![
            product_node("good", "5.00"),
            product_node("broken", "n/a"),
        ]);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].handle, "good");
    }
}
