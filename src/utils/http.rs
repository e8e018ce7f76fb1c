//! Retryable HTTP client construction.
//!
//! Both outbound HTTP dependencies (the feed directory and the schema
//! registry) go through a `reqwest` client wrapped with exponential-backoff
//! retry middleware. Retries apply within one fetch only; the coordination
//! layer itself never retries.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, Jitter, RetryTransientMiddleware};
use std::time::Duration;

/// Configuration for HTTP retry policies.
#[derive(Debug, Clone)]
pub struct HttpRetryConfig {
	/// Maximum number of retries for transient errors.
	pub max_retries: u32,
	/// Base for the exponential backoff calculation.
	pub base_for_backoff: u32,
	/// Backoff before the first retry.
	pub initial_backoff: Duration,
	/// Upper bound on any single backoff.
	pub max_backoff: Duration,
	/// Jitter applied to each backoff.
	pub jitter: Jitter,
}

impl Default for HttpRetryConfig {
	fn default() -> Self {
		Self {
			max_retries: 2,
			base_for_backoff: 2,
			initial_backoff: Duration::from_millis(100),
			max_backoff: Duration::from_secs(2),
			jitter: Jitter::Full,
		}
	}
}

/// Wraps a base `reqwest` client with transient-error retry middleware.
pub fn create_retryable_http_client(
	config: &HttpRetryConfig,
	base_client: reqwest::Client,
) -> ClientWithMiddleware {
	let retry_policy = ExponentialBackoff::builder()
		.base(config.base_for_backoff)
		.retry_bounds(config.initial_backoff, config.max_backoff)
		.jitter(config.jitter)
		.build_with_max_retries(config.max_retries);

	ClientBuilder::new(base_client)
		.with(RetryTransientMiddleware::new_with_policy(retry_policy))
		.build()
}
