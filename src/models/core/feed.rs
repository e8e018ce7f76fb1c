//! Feed configuration as served by the feed directory (RDD).
//!
//! A `FeedConfig` identifies one monitored on-chain aggregator contract. The
//! list of feeds is fetched from the feed directory, replaced wholesale on
//! every refresh, and compared structurally to decide whether the monitoring
//! generation must be restarted.

use std::time::Duration;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedParseError {
	#[error("Failed to parse feed list JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid contract address {address} for feed {feed}: {reason}")]
	InvalidAddress {
		feed: String,
		address: String,
		reason: String,
	},

	#[error("Invalid multiply value {value} for feed {feed}")]
	InvalidMultiply { feed: String, value: String },
}

/// One monitored contract/feed, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedConfig {
	pub id: String,
	pub name: String,
	pub path: String,
	pub symbol: String,
	pub heartbeat: Duration,
	pub contract_type: String,
	pub status: String,
	/// Display form of the contract address, as served by the feed directory.
	pub contract_address: String,
	/// Raw address bytes, used as the Kafka message key.
	pub contract_address_bytes: Address,
	/// Divisor applied to on-chain integer answers to humanize them.
	pub multiply: U256,
}

/// Wire representation of one feed in the directory document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeed {
	#[serde(default)]
	id: Option<String>,
	name: String,
	path: String,
	symbol: String,
	heartbeat_sec: u64,
	contract_type: String,
	status: String,
	contract_address: String,
	multiply: String,
}

impl TryFrom<RawFeed> for FeedConfig {
	type Error = FeedParseError;

	fn try_from(raw: RawFeed) -> Result<Self, Self::Error> {
		let contract_address_bytes: Address =
			raw.contract_address
				.parse()
				.map_err(|e| FeedParseError::InvalidAddress {
					feed: raw.path.clone(),
					address: raw.contract_address.clone(),
					reason: format!("{e}"),
				})?;

		let multiply: U256 = raw
			.multiply
			.parse()
			.map_err(|_| FeedParseError::InvalidMultiply {
				feed: raw.path.clone(),
				value: raw.multiply.clone(),
			})?;

		Ok(FeedConfig {
			// Older directory documents carry no explicit id; the path is
			// unique and stable, so it doubles as one.
			id: raw.id.unwrap_or_else(|| raw.path.clone()),
			name: raw.name,
			path: raw.path,
			symbol: raw.symbol,
			heartbeat: Duration::from_secs(raw.heartbeat_sec),
			contract_type: raw.contract_type,
			status: raw.status,
			contract_address: raw.contract_address,
			contract_address_bytes,
			multiply,
		})
	}
}

/// Parses the feed directory document (a JSON array of feeds) into feed
/// configurations. Fails on the first malformed entry.
pub fn parse_feed_list(document: &[u8]) -> Result<Vec<FeedConfig>, FeedParseError> {
	let raw: Vec<RawFeed> = serde_json::from_slice(document)?;
	raw.into_iter().map(FeedConfig::try_from).collect()
}
