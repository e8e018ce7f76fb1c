//! Observation snapshots produced by sources.
//!
//! An `Envelope` captures one feed's on-chain state at one observation and a
//! `TxResults` counts the transactions observed in one tick. Both are
//! transient values: created by a source, pushed through the poller's update
//! channel, consumed by every exporter for that tick, never persisted.

use alloy::primitives::{Address, I256, U256};

/// On-chain consensus configuration attached to a feed's contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractConfig {
	pub signers: Vec<Vec<u8>>,
	pub transmitters: Vec<Address>,
	pub f: u8,
	/// Protobuf-encoded offchain consensus parameters, passed through opaque.
	pub encoded_offchain_config: Vec<u8>,
}

/// One polled snapshot of a feed's on-chain state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
	pub config_digest: [u8; 32],
	pub epoch: u32,
	pub round: u8,
	pub latest_answer: I256,
	/// Unix timestamp (seconds) of the latest transmission.
	pub latest_timestamp: u64,
	pub contract_config: ContractConfig,
	pub block_number: u64,
	/// Identity of the oracle that sent the latest transmission.
	pub transmitter: Address,
	pub link_balance: U256,
	pub juels_per_fee_coin: U256,
	pub aggregator_round_id: u32,
}

impl Default for Envelope {
	fn default() -> Self {
		Envelope {
			config_digest: [0u8; 32],
			epoch: 0,
			round: 0,
			latest_answer: I256::ZERO,
			latest_timestamp: 0,
			contract_config: ContractConfig::default(),
			block_number: 0,
			transmitter: Address::ZERO,
			link_balance: U256::ZERO,
			juels_per_fee_coin: U256::ZERO,
			aggregator_round_id: 0,
		}
	}
}

/// Count of transactions observed in one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxResults {
	pub num_succeeded: u64,
	pub num_failed: u64,
}

/// A single update flowing from a poller to the exporters. One channel
/// carries both observation kinds so the fan-in stays uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
	Envelope(Envelope),
	TxResults(TxResults),
}
