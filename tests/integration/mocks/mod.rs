//! Shared fixtures and mocks for the integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, I256, U256};
use async_trait::async_trait;
use mockall::mock;

use feed_telemetry::models::{ChainConfig, Envelope, FeedConfig, FeedUpdate};
use feed_telemetry::services::exporter::{Exporter, ExporterError};
use feed_telemetry::services::kafka::{MessageProducer, ProducerError};

mock! {
	pub Exporter {}

	#[async_trait]
	impl Exporter for Exporter {
		async fn export(&self, update: FeedUpdate) -> Result<(), ExporterError>;
		async fn cleanup(&self);
	}
}

/// Captures every published message instead of talking to Kafka.
pub struct CapturingProducer {
	pub sent: Mutex<Vec<(String, Vec<u8>, Vec<u8>)>>,
}

impl CapturingProducer {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			sent: Mutex::new(Vec::new()),
		})
	}
}

#[async_trait]
impl MessageProducer for CapturingProducer {
	async fn send(&self, topic: &str, key: &[u8], payload: &[u8]) -> Result<(), ProducerError> {
		self.sent
			.lock()
			.unwrap()
			.push((topic.to_string(), key.to_vec(), payload.to_vec()));
		Ok(())
	}
}

pub fn test_chain() -> ChainConfig {
	ChainConfig {
		rpc_endpoint: "http://localhost:8545".to_string(),
		network_name: "mainnet".to_string(),
		network_id: "ethereum-mainnet".to_string(),
		chain_id: "1".to_string(),
		read_timeout: Duration::from_millis(200),
		poll_interval: Duration::from_millis(20),
	}
}

pub fn test_feed(id: &str, contract_byte: u8) -> FeedConfig {
	let contract_address_bytes = Address::repeat_byte(contract_byte);
	FeedConfig {
		id: id.to_string(),
		name: format!("{} / USD", id.to_uppercase()),
		path: id.to_string(),
		symbol: "$".to_string(),
		heartbeat: Duration::from_secs(600),
		contract_type: "ocr2".to_string(),
		status: "live".to_string(),
		contract_address: format!("{contract_address_bytes:#x}"),
		contract_address_bytes,
		multiply: U256::from(100_000_000u64),
	}
}

pub fn test_envelope(answer: i64, timestamp: u64) -> Envelope {
	Envelope {
		latest_answer: I256::try_from(answer).unwrap(),
		latest_timestamp: timestamp,
		..Envelope::default()
	}
}
