//! Kafka producer.
//!
//! The [`MessageProducer`] trait is the seam the exporters publish through;
//! the rdkafka-backed implementation below is the production one, tests
//! substitute an in-memory capture.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use thiserror::Error;
use tracing::info;

use crate::models::KafkaConfig;

#[derive(Debug, Error)]
pub enum ProducerError {
	#[error("Kafka error: {0}")]
	Kafka(#[from] rdkafka::error::KafkaError),
}

/// Publishes one message to one topic.
#[async_trait]
pub trait MessageProducer: Send + Sync {
	async fn send(&self, topic: &str, key: &[u8], payload: &[u8]) -> Result<(), ProducerError>;
}

/// Producer over a real Kafka cluster.
pub struct KafkaProducer {
	producer: FutureProducer,
}

impl KafkaProducer {
	pub fn new(config: &KafkaConfig) -> Result<Self, ProducerError> {
		info!("Configuring Kafka producer for {}", config.brokers);

		let mut client_config = ClientConfig::new();
		client_config
			.set("bootstrap.servers", &config.brokers)
			.set("client.id", &config.client_id)
			.set("security.protocol", &config.security_protocol)
			.set("message.timeout.ms", "30000")
			.set("compression.type", "snappy")
			.set("queue.buffering.max.messages", "100000")
			.set("batch.num.messages", "1000")
			.set("linger.ms", "10")
			.set("enable.idempotence", "true");

		if let Some(mechanism) = &config.sasl_mechanism {
			client_config.set("sasl.mechanism", mechanism);
		}
		if let Some(username) = &config.sasl_username {
			client_config.set("sasl.username", username);
		}
		if let Some(password) = &config.sasl_password {
			client_config.set("sasl.password", password);
		}

		Ok(Self {
			producer: client_config.create()?,
		})
	}
}

#[async_trait]
impl MessageProducer for KafkaProducer {
	async fn send(&self, topic: &str, key: &[u8], payload: &[u8]) -> Result<(), ProducerError> {
		let record = FutureRecord::to(topic).key(key).payload(payload);
		self.producer
			.send(record, Duration::from_secs(30))
			.await
			.map_err(|(e, _)| ProducerError::Kafka(e))?;
		Ok(())
	}
}
