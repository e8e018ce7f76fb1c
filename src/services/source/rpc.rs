//! JSON-RPC chain reader for EVM-style aggregator contracts.
//!
//! Uses alloy's raw RPC client: view calls for the latest transmission and
//! config pointers, log queries for the data only events carry (transmitter
//! identity, full contract configuration).

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{aliases::I192, Address, B256, I256, U256};
use alloy::rpc::client::{ClientBuilder, RpcClient};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use serde_json::json;
use url::Url;

use super::{ChainReader, SourceError, TransmissionDetails};
use crate::models::{ChainConfig, ContractConfig, TxResults};

sol! {
	interface Aggregator {
		function latestTransmissionDetails() external view returns (bytes32 configDigest, uint32 epoch, uint8 round, int192 latestAnswer, uint64 latestTimestamp);
		function latestConfigDetails() external view returns (uint32 configCount, uint32 blockNumber, bytes32 configDigest);
		function latestRound() external view returns (uint256);
		function linkAvailableForPayment() external view returns (int256);
	}

	event ConfigSet(
		uint32 previousConfigBlockNumber,
		bytes32 configDigest,
		uint64 configCount,
		address[] signers,
		address[] transmitters,
		uint8 f,
		bytes onchainConfig,
		uint64 offchainConfigVersion,
		bytes offchainConfig
	);

	event NewTransmission(
		uint32 indexed aggregatorRoundId,
		int192 answer,
		address transmitter,
		uint32 observationsTimestamp,
		int192[] observations,
		bytes observers,
		int192 juelsPerFeeCoin,
		bytes32 configDigest,
		uint40 epochAndRound
	);
}

/// How far back to look for the latest `NewTransmission` event.
const TRANSMISSION_LOOKBACK_BLOCKS: u64 = 1000;

pub struct RpcChainReader {
	client: RpcClient,
	/// Last block scanned for transaction results, per contract.
	tx_watermarks: Mutex<HashMap<Address, u64>>,
}

impl RpcChainReader {
	pub fn new(chain: &ChainConfig) -> Result<Self, SourceError> {
		let url = Url::parse(&chain.rpc_endpoint).map_err(|e| {
			SourceError::Construction(format!(
				"Invalid RPC endpoint {}: {}",
				chain.rpc_endpoint, e
			))
		})?;

		Ok(Self {
			client: ClientBuilder::default().http(url),
			tx_watermarks: Mutex::new(HashMap::new()),
		})
	}

	async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, SourceError> {
		let params = json!([
			{ "to": to, "data": format!("0x{}", hex::encode(data)) },
			"latest",
		]);
		let result: String = self
			.client
			.request("eth_call", params)
			.await
			.map_err(|e| SourceError::ChainRead(format!("eth_call failed: {e}")))?;
		hex::decode(result.trim_start_matches("0x"))
			.map_err(|e| SourceError::ChainRead(format!("Malformed eth_call result: {e}")))
	}

	async fn get_logs(
		&self,
		contract: Address,
		topic: B256,
		from_block: u64,
		to_block: u64,
	) -> Result<Vec<Log>, SourceError> {
		let params = json!([{
			"address": contract,
			"topics": [topic],
			"fromBlock": format!("0x{from_block:x}"),
			"toBlock": format!("0x{to_block:x}"),
		}]);
		self.client
			.request("eth_getLogs", params)
			.await
			.map_err(|e| SourceError::ChainRead(format!("eth_getLogs failed: {e}")))
	}
}

#[async_trait]
impl ChainReader for RpcChainReader {
	async fn latest_block_height(&self) -> Result<u64, SourceError> {
		let height: String = self
			.client
			.request_noparams("eth_blockNumber")
			.await
			.map_err(|e| SourceError::ChainRead(format!("eth_blockNumber failed: {e}")))?;
		u64::from_str_radix(height.trim_start_matches("0x"), 16)
			.map_err(|e| SourceError::ChainRead(format!("Malformed block number {height}: {e}")))
	}

	async fn latest_transmission_details(
		&self,
		contract: Address,
	) -> Result<TransmissionDetails, SourceError> {
		let raw = self
			.call(contract, Aggregator::latestTransmissionDetailsCall {}.abi_encode())
			.await?;
		let details = Aggregator::latestTransmissionDetailsCall::abi_decode_returns(&raw)
			.map_err(|e| SourceError::ChainRead(format!("Bad latestTransmissionDetails: {e}")))?;

		// Transmitter identity and fee-coin rate only exist on the event.
		let head = self.latest_block_height().await?;
		let from_block = head.saturating_sub(TRANSMISSION_LOOKBACK_BLOCKS);
		let logs = self
			.get_logs(contract, NewTransmission::SIGNATURE_HASH, from_block, head)
			.await?;
		let last = logs.last().ok_or_else(|| {
			SourceError::ChainRead(format!(
				"No NewTransmission event within {TRANSMISSION_LOOKBACK_BLOCKS} blocks of head"
			))
		})?;
		let event = last
			.log_decode::<NewTransmission>()
			.map_err(|e| SourceError::ChainRead(format!("Bad NewTransmission log: {e}")))?;
		let transmission = &event.inner.data;

		Ok(TransmissionDetails {
			config_digest: details.configDigest.0,
			epoch: details.epoch,
			round: details.round,
			latest_answer: i192_to_i256(details.latestAnswer),
			latest_timestamp: details.latestTimestamp,
			transmitter: transmission.transmitter,
			juels_per_fee_coin: i192_to_u256(transmission.juelsPerFeeCoin),
		})
	}

	async fn latest_config(&self, contract: Address) -> Result<ContractConfig, SourceError> {
		let raw = self
			.call(contract, Aggregator::latestConfigDetailsCall {}.abi_encode())
			.await?;
		let details = Aggregator::latestConfigDetailsCall::abi_decode_returns(&raw)
			.map_err(|e| SourceError::ChainRead(format!("Bad latestConfigDetails: {e}")))?;

		let config_block = details.blockNumber as u64;
		let logs = self
			.get_logs(contract, ConfigSet::SIGNATURE_HASH, config_block, config_block)
			.await?;
		let last = logs.last().ok_or_else(|| {
			SourceError::ChainRead(format!("No ConfigSet event at block {config_block}"))
		})?;
		let event = last
			.log_decode::<ConfigSet>()
			.map_err(|e| SourceError::ChainRead(format!("Bad ConfigSet log: {e}")))?;
		let config = &event.inner.data;

		Ok(ContractConfig {
			signers: config.signers.iter().map(|s| s.to_vec()).collect(),
			transmitters: config.transmitters.clone(),
			f: config.f,
			encoded_offchain_config: config.offchainConfig.to_vec(),
		})
	}

	async fn link_available_for_payment(&self, contract: Address) -> Result<U256, SourceError> {
		let raw = self
			.call(contract, Aggregator::linkAvailableForPaymentCall {}.abi_encode())
			.await?;
		let available: I256 = Aggregator::linkAvailableForPaymentCall::abi_decode_returns(&raw)
			.map_err(|e| SourceError::ChainRead(format!("Bad linkAvailableForPayment: {e}")))?;
		// The contract reports a deficit as a negative balance.
		Ok(if available.is_negative() {
			U256::ZERO
		} else {
			available.into_raw()
		})
	}

	async fn latest_round_id(&self, contract: Address) -> Result<u32, SourceError> {
		let raw = self
			.call(contract, Aggregator::latestRoundCall {}.abi_encode())
			.await?;
		let round: U256 = Aggregator::latestRoundCall::abi_decode_returns(&raw)
			.map_err(|e| SourceError::ChainRead(format!("Bad latestRound: {e}")))?;
		Ok(round.saturating_to::<u32>())
	}

	async fn tx_results(&self, contract: Address) -> Result<TxResults, SourceError> {
		let head = self.latest_block_height().await?;
		let from_block = {
			let watermarks = self
				.tx_watermarks
				.lock()
				.map_err(|_| SourceError::ChainRead("Watermark lock poisoned".to_string()))?;
			watermarks
				.get(&contract)
				.map(|last| last + 1)
				.unwrap_or(head)
		};

		let mut num_succeeded = 0;
		if from_block <= head {
			let logs = self
				.get_logs(contract, NewTransmission::SIGNATURE_HASH, from_block, head)
				.await?;
			num_succeeded = logs.len() as u64;
		}

		if let Ok(mut watermarks) = self.tx_watermarks.lock() {
			watermarks.insert(contract, head);
		}

		// Reverted transmissions leave no logs; only successes are
		// observable through this endpoint.
		Ok(TxResults {
			num_succeeded,
			num_failed: 0,
		})
	}
}

fn i192_to_i256(value: I192) -> I256 {
	let mut bytes = [if value.is_negative() { 0xff } else { 0x00 }; 32];
	bytes[8..].copy_from_slice(&value.to_be_bytes::<24>());
	I256::from_be_bytes(bytes)
}

fn i192_to_u256(value: I192) -> U256 {
	if value.is_negative() {
		return U256::ZERO;
	}
	let mut bytes = [0u8; 32];
	bytes[8..].copy_from_slice(&value.to_be_bytes::<24>());
	U256::from_be_bytes(bytes)
}
