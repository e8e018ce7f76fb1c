//! Exporters.
//!
//! An [`Exporter`] consumes feed updates and pushes them somewhere useful:
//! the Prometheus registry or Kafka. Exporters for one feed are built by
//! [`ExporterFactory`] implementations when the feed's monitor starts, and
//! their [`Exporter::cleanup`] runs exactly once when it stops.

mod kafka;
mod prometheus;

pub use kafka::{KafkaExporter, KafkaExporterFactory};
pub use prometheus::{PrometheusExporter, PrometheusExporterFactory};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ChainConfig, FeedConfig, FeedUpdate};
use crate::services::kafka::ProducerError;

#[derive(Debug, Error)]
pub enum ExporterError {
	#[error("Avro encoding failed: {0}")]
	Avro(#[from] apache_avro::Error),

	#[error(transparent)]
	Kafka(#[from] ProducerError),
}

/// Consumes updates for one feed.
///
/// `export` is called once per update; implementations must tolerate
/// duplicate observations of the same transmission. `cleanup` releases any
/// externally visible state (metric series) when the feed stops being
/// monitored.
#[async_trait]
pub trait Exporter: Send + Sync {
	async fn export(&self, update: FeedUpdate) -> Result<(), ExporterError>;
	async fn cleanup(&self);
}

/// Builds one exporter per (chain, feed) pair.
pub trait ExporterFactory: Send + Sync {
	fn make_exporter(
		&self,
		chain: &ChainConfig,
		feed: &FeedConfig,
	) -> Result<Arc<dyn Exporter>, ExporterError>;
}
