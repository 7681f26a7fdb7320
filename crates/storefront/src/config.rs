//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_TOKEN` - Storefront API access token
//!
//! ## Optional
//! - `KIMBA_HOST` - Bind address (default: 127.0.0.1)
//! - `KIMBA_PORT` - Listen port (default: 3000)
//! - `KIMBA_CART_DIR` - Directory holding persisted cart snapshots (default: .kimba/carts)
//! - `KIMBA_DEFAULT_CURRENCY` - Currency for local catalog prices (default: USD)
//! - `KIMBA_CLEAR_CART_ON_CHECKOUT` - Clear the storefront cart once checkout opens (default: false)
//! - `SHOPIFY_API_VERSION` - API version (default: 2025-07)
//! - `SHOPIFY_PRODUCT_CACHE_TTL_SECS` - Product cache TTL in seconds (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use kimba_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;

use crate::cart::CheckoutPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Cart persistence settings
    pub cart: CartConfig,
    /// Shopify Storefront API configuration
    pub shopify: ShopifyStorefrontConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g., "production")
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Cart store configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Directory holding one JSON snapshot per cart namespace
    pub storage_dir: PathBuf,
    /// Currency applied to local catalog prices, which carry none
    pub default_currency: CurrencyCode,
    /// What happens to the storefront cart after checkout opens
    pub checkout_policy: CheckoutPolicy,
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyStorefrontConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2025-07)
    pub api_version: String,
    /// Storefront API access token
    pub storefront_token: SecretString,
    /// How long product lookups stay cached
    pub product_cache_ttl: Duration,
}

impl std::fmt::Debug for ShopifyStorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyStorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_token", &"[REDACTED]")
            .field("product_cache_ttl", &self.product_cache_ttl)
            .finish()
    }
}

impl ShopifyStorefrontConfig {
    /// GraphQL endpoint for this store and API version.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/api/{}/graphql.json",
            self.store, self.api_version
        )
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the storefront token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_parsed_or_default::<IpAddr>("KIMBA_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("KIMBA_PORT", "3000")?;

        let cart = CartConfig::from_env()?;
        let shopify = ShopifyStorefrontConfig::from_env()?;

        Ok(Self {
            host,
            port,
            cart,
            shopify,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let clear_on_success = parse_bool(
            "KIMBA_CLEAR_CART_ON_CHECKOUT",
            &get_env_or_default("KIMBA_CLEAR_CART_ON_CHECKOUT", "false"),
        )?;

        Ok(Self {
            storage_dir: PathBuf::from(get_env_or_default("KIMBA_CART_DIR", ".kimba/carts")),
            default_currency: get_parsed_or_default("KIMBA_DEFAULT_CURRENCY", "USD")?,
            checkout_policy: CheckoutPolicy { clear_on_success },
        })
    }
}

impl ShopifyStorefrontConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let ttl_secs = get_parsed_or_default::<u64>("SHOPIFY_PRODUCT_CACHE_TTL_SECS", "300")?;

        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2025-07"),
            storefront_token: get_validated_secret("SHOPIFY_STOREFRONT_TOKEN")?,
            product_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed into `T`, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a boolean flag, accepting the usual spellings.
fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Storefront tokens are random hex, so they clear this easily
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shopify_config() -> ShopifyStorefrontConfig {
        ShopifyStorefrontConfig {
            store: "kimba-pets.myshopify.com".to_string(),
            api_version: "2025-07".to_string(),
            storefront_token: SecretString::from("3f9a1c77e0b24d5e8a6f2b9c4d1e7a03"),
            product_cache_ttl: Duration::from_secs(300),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-storefront-token", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_hex_token() {
        assert!(validate_secret_strength("3f9a1c77e0b24d5e8a6f2b9c4d1e7a03", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("K", "true").unwrap());
        assert!(parse_bool("K", " YES ").unwrap());
        assert!(!parse_bool("K", "0").unwrap());
        assert!(!parse_bool("K", "").unwrap());
        assert!(matches!(
            parse_bool("K", "maybe"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("KIMBA_PORT", "70000").unwrap_err();
        assert!(err.to_string().contains("KIMBA_PORT"));

        let currency = parse_value::<CurrencyCode>("KIMBA_DEFAULT_CURRENCY", "inr").unwrap();
        assert_eq!(currency, CurrencyCode::INR);
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            shopify_config().endpoint(),
            "https://kimba-pets.myshopify.com/api/2025-07/graphql.json"
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            cart: CartConfig {
                storage_dir: PathBuf::from("/tmp/carts"),
                default_currency: CurrencyCode::USD,
                checkout_policy: CheckoutPolicy::default(),
            },
            shopify: shopify_config(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_shopify_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", shopify_config());

        assert!(debug_output.contains("kimba-pets.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("3f9a1c77e0b24d5e8a6f2b9c4d1e7a03"));
    }
}
