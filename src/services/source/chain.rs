//! Envelope and transaction-result sources over a chain reader.
//!
//! The [`ChainReader`] trait is the narrow seam to the underlying RPC/ABI
//! client; everything above it only sees assembled [`Envelope`] and
//! [`TxResults`] values.

use std::sync::Arc;

use alloy::primitives::{Address, I256, U256};
use async_trait::async_trait;

use super::{Source, SourceError, SourceFactory};
use crate::models::{ChainConfig, ContractConfig, Envelope, FeedConfig, FeedUpdate, TxResults};

/// The latest transmission as recorded on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionDetails {
	pub config_digest: [u8; 32],
	pub epoch: u32,
	pub round: u8,
	pub latest_answer: I256,
	pub latest_timestamp: u64,
	pub transmitter: Address,
	pub juels_per_fee_coin: U256,
}

/// Narrow read interface over one chain's RPC endpoint for one aggregator
/// contract family.
#[async_trait]
pub trait ChainReader: Send + Sync {
	async fn latest_block_height(&self) -> Result<u64, SourceError>;

	async fn latest_transmission_details(
		&self,
		contract: Address,
	) -> Result<TransmissionDetails, SourceError>;

	async fn latest_config(&self, contract: Address) -> Result<ContractConfig, SourceError>;

	async fn link_available_for_payment(&self, contract: Address) -> Result<U256, SourceError>;

	async fn latest_round_id(&self, contract: Address) -> Result<u32, SourceError>;

	async fn tx_results(&self, contract: Address) -> Result<TxResults, SourceError>;
}

/// Assembles one [`Envelope`] per fetch. Reads are strictly sequential; the
/// poller guarantees no two fetches of the same source overlap.
pub struct EnvelopeSource {
	reader: Arc<dyn ChainReader>,
	contract: Address,
}

impl EnvelopeSource {
	pub fn new(reader: Arc<dyn ChainReader>, contract: Address) -> Self {
		Self { reader, contract }
	}
}

#[async_trait]
impl Source<FeedUpdate> for EnvelopeSource {
	async fn fetch(&self) -> Result<FeedUpdate, SourceError> {
		let transmission = self
			.reader
			.latest_transmission_details(self.contract)
			.await?;
		let contract_config = self.reader.latest_config(self.contract).await?;
		let block_number = self.reader.latest_block_height().await?;
		let link_balance = self.reader.link_available_for_payment(self.contract).await?;
		let aggregator_round_id = self.reader.latest_round_id(self.contract).await?;

		Ok(FeedUpdate::Envelope(Envelope {
			config_digest: transmission.config_digest,
			epoch: transmission.epoch,
			round: transmission.round,
			latest_answer: transmission.latest_answer,
			latest_timestamp: transmission.latest_timestamp,
			contract_config,
			block_number,
			transmitter: transmission.transmitter,
			link_balance,
			juels_per_fee_coin: transmission.juels_per_fee_coin,
			aggregator_round_id,
		}))
	}
}

/// Counts the transactions observed for the feed contract in one tick.
pub struct TxResultsSource {
	reader: Arc<dyn ChainReader>,
	contract: Address,
}

impl TxResultsSource {
	pub fn new(reader: Arc<dyn ChainReader>, contract: Address) -> Self {
		Self { reader, contract }
	}
}

#[async_trait]
impl Source<FeedUpdate> for TxResultsSource {
	async fn fetch(&self) -> Result<FeedUpdate, SourceError> {
		let results = self.reader.tx_results(self.contract).await?;
		Ok(FeedUpdate::TxResults(results))
	}
}

pub struct EnvelopeSourceFactory {
	reader: Arc<dyn ChainReader>,
}

impl EnvelopeSourceFactory {
	pub fn new(reader: Arc<dyn ChainReader>) -> Self {
		Self { reader }
	}
}

impl SourceFactory for EnvelopeSourceFactory {
	fn make_source(
		&self,
		_chain: &ChainConfig,
		feed: &FeedConfig,
	) -> Result<Arc<dyn Source<FeedUpdate>>, SourceError> {
		Ok(Arc::new(EnvelopeSource::new(
			self.reader.clone(),
			feed.contract_address_bytes,
		)))
	}
}

pub struct TxResultsSourceFactory {
	reader: Arc<dyn ChainReader>,
}

impl TxResultsSourceFactory {
	pub fn new(reader: Arc<dyn ChainReader>) -> Self {
		Self { reader }
	}
}

impl SourceFactory for TxResultsSourceFactory {
	fn make_source(
		&self,
		_chain: &ChainConfig,
		feed: &FeedConfig,
	) -> Result<Arc<dyn Source<FeedUpdate>>, SourceError> {
		Ok(Arc::new(TxResultsSource::new(
			self.reader.clone(),
			feed.contract_address_bytes,
		)))
	}
}
