//! Fake sources backing the `FEATURE_TEST_ONLY_FAKE_*` switches.
//!
//! These run the full monitoring pipeline without a chain or a feed
//! directory: the chain reader emits a deterministic stream of envelopes and
//! the directory source serves a configurable in-memory feed list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, I256, U256};
use async_trait::async_trait;

use super::{ChainReader, Source, SourceError, TransmissionDetails};
use crate::models::{ContractConfig, FeedConfig, TxResults};

/// Deterministic chain reader: every transmission read advances one round
/// and moves the answer by one step.
pub struct FakeChainReader {
	base_answer: i64,
	tick: AtomicU64,
	transmitters: Vec<Address>,
}

impl FakeChainReader {
	pub fn new(base_answer: i64) -> Self {
		Self {
			base_answer,
			tick: AtomicU64::new(0),
			transmitters: vec![
				Address::repeat_byte(0x11),
				Address::repeat_byte(0x22),
				Address::repeat_byte(0x33),
			],
		}
	}

	fn now() -> u64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_secs())
			.unwrap_or(0)
	}
}

impl Default for FakeChainReader {
	fn default() -> Self {
		Self::new(250_000_000_000)
	}
}

#[async_trait]
impl ChainReader for FakeChainReader {
	async fn latest_block_height(&self) -> Result<u64, SourceError> {
		Ok(1_000_000 + self.tick.load(Ordering::Relaxed))
	}

	async fn latest_transmission_details(
		&self,
		_contract: Address,
	) -> Result<TransmissionDetails, SourceError> {
		let tick = self.tick.fetch_add(1, Ordering::Relaxed);
		Ok(TransmissionDetails {
			config_digest: [0xd1; 32],
			epoch: (tick / 256) as u32 + 1,
			round: (tick % 256) as u8,
			latest_answer: I256::try_from(self.base_answer + tick as i64)
				.unwrap_or(I256::ZERO),
			latest_timestamp: Self::now(),
			transmitter: self.transmitters[tick as usize % self.transmitters.len()],
			juels_per_fee_coin: U256::from(5_000_000_000_000_000u64),
		})
	}

	async fn latest_config(&self, _contract: Address) -> Result<ContractConfig, SourceError> {
		Ok(ContractConfig {
			signers: self.transmitters.iter().map(|t| t.to_vec()).collect(),
			transmitters: self.transmitters.clone(),
			f: 1,
			encoded_offchain_config: vec![0x0a, 0x02, 0x08, 0x01],
		})
	}

	async fn link_available_for_payment(&self, _contract: Address) -> Result<U256, SourceError> {
		Ok(U256::from(7_000_000_000_000_000_000u64))
	}

	async fn latest_round_id(&self, _contract: Address) -> Result<u32, SourceError> {
		Ok(self.tick.load(Ordering::Relaxed) as u32)
	}

	async fn tx_results(&self, _contract: Address) -> Result<TxResults, SourceError> {
		Ok(TxResults {
			num_succeeded: 1,
			num_failed: 0,
		})
	}
}

/// In-memory feed directory.
pub struct FakeRddSource {
	feeds: Mutex<Vec<FeedConfig>>,
}

impl FakeRddSource {
	pub fn new(feeds: Vec<FeedConfig>) -> Self {
		Self {
			feeds: Mutex::new(feeds),
		}
	}

	/// Replaces the served feed list; the next fetch observes the change.
	pub fn set_feeds(&self, feeds: Vec<FeedConfig>) {
		if let Ok(mut current) = self.feeds.lock() {
			*current = feeds;
		}
	}
}

#[async_trait]
impl Source<Vec<FeedConfig>> for FakeRddSource {
	async fn fetch(&self) -> Result<Vec<FeedConfig>, SourceError> {
		self.feeds
			.lock()
			.map(|feeds| feeds.clone())
			.map_err(|_| SourceError::Construction("Feed list lock poisoned".to_string()))
	}
}
