//! Chain/network configuration.

use std::time::Duration;

use serde::Serialize;

/// One monitored chain. Supplied once at process start and immutable for
/// the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainConfig {
	pub rpc_endpoint: String,
	pub network_name: String,
	pub network_id: String,
	pub chain_id: String,
	/// Upper bound for a single chain read.
	pub read_timeout: Duration,
	/// Interval between consecutive feed polls.
	pub poll_interval: Duration,
}
