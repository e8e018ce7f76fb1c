//! Utility modules for common functionality.
//!
//! - `http`: retryable HTTP client construction
//! - `logging`: tracing setup
//! - `metrics`: the Prometheus metrics object and the HTTP server

mod http;

pub mod logging;
pub mod metrics;

pub use http::{create_retryable_http_client, HttpRetryConfig};
