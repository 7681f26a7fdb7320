//! GraphQL operations for the Shopify Storefront API.
//!
//! Each operation implements `graphql_client::GraphQLQuery` by hand. The
//! query text lives next to the response shapes it deserializes into, so the
//! client needs no generated code or schema file at build time.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

// Scalar types as Shopify returns them (decimal and URL scalars are strings)
#[allow(clippy::upper_case_acronyms)]
type Decimal = String;
#[allow(clippy::upper_case_acronyms)]
type URL = String;

/// Fields selected for every product, shared by the product queries.
macro_rules! product_fields {
    () => {
        r"
fragment ProductFields on Product {
  id
  handle
  title
  description
  availableForSale
  priceRange {
    minVariantPrice { amount currencyCode }
    maxVariantPrice { amount currencyCode }
  }
  images(first: 5) {
    edges { node { url altText } }
  }
  options { name values }
  variants(first: 50) {
    edges {
      node {
        id
        title
        availableForSale
        price { amount currencyCode }
        selectedOptions { name value }
      }
    }
  }
}
"
    };
}

// =============================================================================
// Shared response shapes
// =============================================================================

/// Generic `{ edges: [{ node }] }` connection.
#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyV2 {
    pub amount: Decimal,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPriceRange {
    pub min_variant_price: MoneyV2,
    pub max_variant_price: MoneyV2,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageNode {
    pub url: URL,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectedOptionNode {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductOptionNode {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: String,
    pub title: String,
    pub available_for_sale: bool,
    pub price: MoneyV2,
    pub selected_options: Vec<SelectedOptionNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub available_for_sale: bool,
    pub price_range: ProductPriceRange,
    pub images: Connection<ImageNode>,
    #[serde(default)]
    pub options: Vec<ProductOptionNode>,
    pub variants: Connection<VariantNode>,
}

// =============================================================================
// Product queries
// =============================================================================

/// Bounded product listing.
pub struct GetProducts;

pub mod get_products {
    use super::{Connection, Deserialize, ProductNode, Serialize};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub first: i64,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub products: Connection<ProductNode>,
    }
}

impl GraphQLQuery for GetProducts {
    type Variables = get_products::Variables;
    type ResponseData = get_products::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: concat!(
                "query GetProducts($first: Int!) {\n",
                "  products(first: $first) { edges { node { ...ProductFields } } }\n",
                "}\n",
                product_fields!()
            ),
            operation_name: "GetProducts",
        }
    }
}

/// Single product lookup by handle.
pub struct GetProductByHandle;

pub mod get_product_by_handle {
    use super::{Deserialize, ProductNode, Serialize};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub handle: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_by_handle: Option<ProductNode>,
    }
}

impl GraphQLQuery for GetProductByHandle {
    type Variables = get_product_by_handle::Variables;
    type ResponseData = get_product_by_handle::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: concat!(
                "query GetProductByHandle($handle: String!) {\n",
                "  productByHandle(handle: $handle) { ...ProductFields }\n",
                "}\n",
                product_fields!()
            ),
            operation_name: "GetProductByHandle",
        }
    }
}

// =============================================================================
// Checkout mutation
// =============================================================================

/// `cartCreate` mutation returning the hosted checkout URL.
pub struct CreateCheckoutCart;

pub mod create_checkout_cart {
    use super::{Deserialize, Serialize, URL};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CartInput,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct CartInput {
        pub lines: Vec<CartLineInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartLineInput {
        pub merchandise_id: String,
        pub quantity: i64,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_create: Option<CartCreatePayload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartCreatePayload {
        pub cart: Option<CreatedCart>,
        #[serde(default)]
        pub user_errors: Vec<CartUserError>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreatedCart {
        pub id: String,
        pub checkout_url: URL,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct CartUserError {
        pub field: Option<Vec<String>>,
        pub message: String,
    }
}

impl GraphQLQuery for CreateCheckoutCart {
    type Variables = create_checkout_cart::Variables;
    type ResponseData = create_checkout_cart::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: concat!(
                "mutation CreateCheckoutCart($input: CartInput!) {\n",
                "  cartCreate(input: $input) {\n",
                "    cart { id checkoutUrl }\n",
                "    userErrors { field message }\n",
                "  }\n",
                "}\n"
            ),
            operation_name: "CreateCheckoutCart",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_checkout_variables_are_camel_case() {
        let body = CreateCheckoutCart::build_query(create_checkout_cart::Variables {
            input: create_checkout_cart::CartInput {
                lines: vec![create_checkout_cart::CartLineInput {
                    merchandise_id: "gid://shopify/ProductVariant/1".to_string(),
                    quantity: 2,
                }],
            },
        });

        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["operationName"], "CreateCheckoutCart");
        assert_eq!(
            json["variables"]["input"]["lines"][0]["merchandiseId"],
            "gid://shopify/ProductVariant/1"
        );
        assert_eq!(json["variables"]["input"]["lines"][0]["quantity"], 2);
    }

    #[test]
    fn test_product_fragment_is_appended() {
        let body = GetProducts::build_query(get_products::Variables { first: 20 });
        assert!(body.query.contains("...ProductFields"));
        assert!(body.query.contains("fragment ProductFields on Product"));

        let body = GetProductByHandle::build_query(get_product_by_handle::Variables {
            handle: "salmon-kibble".to_string(),
        });
        assert!(body.query.contains("fragment ProductFields on Product"));
    }
}
