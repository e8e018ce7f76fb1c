//! Kafka exporter.
//!
//! Each envelope fans out into two messages: a `transmission` record and a
//! `config_set_simplified` record, published to their own topics and keyed
//! by the feed's contract address so one feed stays on one partition.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use super::{Exporter, ExporterError, ExporterFactory};
use crate::models::{ChainConfig, Envelope, FeedConfig, FeedUpdate};
use crate::services::kafka::{
	encode_with_framing, make_config_set_simplified_mapping, make_transmission_mapping,
	MessageProducer, RegisteredSchema,
};

pub struct KafkaExporter {
	producer: Arc<dyn MessageProducer>,
	chain: ChainConfig,
	feed: FeedConfig,
	transmission_topic: String,
	transmission_schema: RegisteredSchema,
	config_set_topic: String,
	config_set_schema: RegisteredSchema,
}

impl KafkaExporter {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		producer: Arc<dyn MessageProducer>,
		chain: ChainConfig,
		feed: FeedConfig,
		transmission_topic: String,
		transmission_schema: RegisteredSchema,
		config_set_topic: String,
		config_set_schema: RegisteredSchema,
	) -> Self {
		Self {
			producer,
			chain,
			feed,
			transmission_topic,
			transmission_schema,
			config_set_topic,
			config_set_schema,
		}
	}

	async fn publish(
		&self,
		topic: &str,
		schema: &RegisteredSchema,
		value: apache_avro::types::Value,
	) -> Result<(), ExporterError> {
		let payload = encode_with_framing(schema, value)?;
		self.producer
			.send(topic, self.feed.contract_address_bytes.as_slice(), &payload)
			.await?;
		Ok(())
	}

	async fn export_envelope(&self, envelope: &Envelope) -> Result<(), ExporterError> {
		let transmission = make_transmission_mapping(envelope, &self.chain, &self.feed);
		let config_set = make_config_set_simplified_mapping(envelope, &self.feed);

		// The two topics are independent; a failure on one must not stop the
		// other.
		let (transmission_result, config_result) = tokio::join!(
			self.publish(&self.transmission_topic, &self.transmission_schema, transmission),
			self.publish(&self.config_set_topic, &self.config_set_schema, config_set),
		);

		if let Err(e) = &transmission_result {
			error!(
				"Failed to publish transmission for feed {} to {}: {}",
				self.feed.id, self.transmission_topic, e
			);
		}
		if let Err(e) = &config_result {
			error!(
				"Failed to publish config set for feed {} to {}: {}",
				self.feed.id, self.config_set_topic, e
			);
		}

		transmission_result.and(config_result)
	}
}

#[async_trait]
impl Exporter for KafkaExporter {
	async fn export(&self, update: FeedUpdate) -> Result<(), ExporterError> {
		match update {
			FeedUpdate::Envelope(envelope) => self.export_envelope(&envelope).await,
			// Transaction counts are a Prometheus-only concern.
			FeedUpdate::TxResults(_) => Ok(()),
		}
	}

	async fn cleanup(&self) {}
}

pub struct KafkaExporterFactory {
	producer: Arc<dyn MessageProducer>,
	transmission_topic: String,
	transmission_schema: RegisteredSchema,
	config_set_topic: String,
	config_set_schema: RegisteredSchema,
}

impl KafkaExporterFactory {
	pub fn new(
		producer: Arc<dyn MessageProducer>,
		transmission_topic: String,
		transmission_schema: RegisteredSchema,
		config_set_topic: String,
		config_set_schema: RegisteredSchema,
	) -> Self {
		Self {
			producer,
			transmission_topic,
			transmission_schema,
			config_set_topic,
			config_set_schema,
		}
	}
}

impl ExporterFactory for KafkaExporterFactory {
	fn make_exporter(
		&self,
		chain: &ChainConfig,
		feed: &FeedConfig,
	) -> Result<Arc<dyn Exporter>, ExporterError> {
		Ok(Arc::new(KafkaExporter::new(
			self.producer.clone(),
			chain.clone(),
			feed.clone(),
			self.transmission_topic.clone(),
			self.transmission_schema.clone(),
			self.config_set_topic.clone(),
			self.config_set_schema.clone(),
		)))
	}
}
