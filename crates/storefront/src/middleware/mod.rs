//! HTTP middleware stack for the cart service.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. `CorsLayer` (browser client on another origin)
//! 4. Request ID (add unique ID to each request)

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, make_request_span, request_id_middleware};
