//! Core types for Kimba Petverse.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;

pub use id::*;
pub use price::{CurrencyCode, Money, MoneyError, saturating_sum};
