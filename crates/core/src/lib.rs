//! Kimba Petverse Core - Shared types library.
//!
//! This crate provides the value types used across Kimba Petverse components:
//! - `storefront` - Commerce client, cart stores and the cart HTTP service
//! - `integration-tests` - Router-level tests against a mocked storefront API
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for opaque IDs and fixed-point money

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
