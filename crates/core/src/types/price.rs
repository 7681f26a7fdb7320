//! Type-safe price representation using decimal arithmetic.
//!
//! Storefront prices arrive as decimal strings paired with a currency code.
//! They are parsed once into [`Money`] so that totals are computed with
//! fixed-point arithmetic and never with floats.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing monetary values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The amount is not a valid decimal number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The currency code is not three ASCII letters.
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Parse an amount string and currency code as returned by the storefront API.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError` if the amount is not a decimal or the currency
    /// code is malformed.
    pub fn parse(amount: &str, currency_code: &str) -> Result<Self, MoneyError> {
        let amount = Decimal::from_str(amount.trim())
            .map_err(|_| MoneyError::InvalidAmount(amount.to_string()))?;
        let currency_code = currency_code.parse()?;
        Ok(Self::new(amount, currency_code))
    }

    /// Line total for `quantity` units of this price, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(
            self.amount.saturating_mul(Decimal::from(quantity)),
            self.currency_code,
        )
    }

    /// Format for display (e.g., "$19.99", or "NZD 19.99" without a known symbol).
    #[must_use]
    pub fn display(&self) -> String {
        let amount = self.amount.round_dp(2);
        match self.currency_code.symbol() {
            Some(symbol) => format!("{symbol}{amount:.2}"),
            None => format!("{} {amount:.2}", self.currency_code),
        }
    }
}

/// Sum decimal amounts, saturating instead of overflowing.
#[must_use]
pub fn saturating_sum(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// ISO 4217 currency codes.
///
/// The common codes get their own variant and display symbol; any other
/// three-letter code is carried as [`CurrencyCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    INR,
    /// Upper-case ASCII letters of a code without its own variant.
    Other([u8; 3]),
}

impl CurrencyCode {
    /// Three-letter ISO code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::INR => "INR",
            Self::Other(code) => std::str::from_utf8(code).unwrap_or("XXX"),
        }
    }

    /// Display symbol, if the currency has one we render.
    #[must_use]
    pub const fn symbol(self) -> Option<&'static str> {
        match self {
            Self::USD | Self::CAD | Self::AUD => Some("$"),
            Self::EUR => Some("€"),
            Self::GBP => Some("£"),
            Self::INR => Some("₹"),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "INR" => Ok(Self::INR),
            _ => match <[u8; 3]>::try_from(upper.as_bytes()) {
                Ok(code) if code.iter().all(u8::is_ascii_alphabetic) => Ok(Self::Other(code)),
                _ => Err(MoneyError::InvalidCurrency(s.to_string())),
            },
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.code().to_string()
    }
}
