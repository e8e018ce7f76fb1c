//! Bootstrap module wiring configuration into the running pipeline.
//!
//! Everything concrete is decided here: which chain reader backs the
//! sources (real RPC or the test-only fake), which exporters run, and how
//! the feed-directory poller feeds the manager. `main` only spawns what this
//! module hands back.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::models::{Config, FeedConfig};
use crate::services::exporter::{
	ExporterFactory, KafkaExporterFactory, PrometheusExporterFactory,
};
use crate::services::kafka::{
	value_subject, HttpSchemaRegistry, KafkaProducer, SchemaRegistry,
	CONFIG_SET_SIMPLIFIED_SCHEMA, TRANSMISSION_SCHEMA,
};
use crate::services::monitor::{GenerationRunner, Manager, MultiFeedMonitor, SharedFeedList};
use crate::services::poller::Poller;
use crate::services::source::{
	ChainReader, EnvelopeSourceFactory, FakeChainReader, FakeRddSource, RddSource,
	RpcChainReader, Source, SourceFactory, TxResultsSourceFactory,
};
use crate::utils::metrics::Metrics;
use crate::utils::{create_retryable_http_client, HttpRetryConfig};

/// The assembled but not yet running pipeline.
pub struct Pipeline {
	pub shared_feeds: SharedFeedList,
	rdd_poller: Poller<Vec<FeedConfig>>,
	feed_lists_rx: mpsc::Receiver<Vec<FeedConfig>>,
	manager: Manager,
}

impl Pipeline {
	/// Runs the feed-directory poller and the manager until shutdown; the
	/// manager drains its monitors before this resolves.
	pub async fn run(self, shutdown: watch::Receiver<bool>) {
		let poller = tokio::spawn(self.rdd_poller.run(shutdown.clone()));
		let manager = tokio::spawn(self.manager.run(self.feed_lists_rx, shutdown));
		let _ = tokio::join!(poller, manager);
	}
}

/// Builds the full pipeline from configuration. Registers the Avro schemas
/// with the schema registry; a registry that cannot be reached is fatal.
pub async fn initialize_pipeline(config: &Config, metrics: Arc<Metrics>) -> Result<Pipeline> {
	let http_client =
		create_retryable_http_client(&HttpRetryConfig::default(), reqwest::Client::new());

	let reader: Arc<dyn ChainReader> = if config.feature.test_only_fake_readers {
		warn!("FEATURE_TEST_ONLY_FAKE_READERS is set; using the fake chain reader");
		Arc::new(FakeChainReader::default())
	} else {
		Arc::new(RpcChainReader::new(&config.chain).context("failed to build the RPC client")?)
	};

	let source_factories: Vec<Arc<dyn SourceFactory>> = vec![
		Arc::new(EnvelopeSourceFactory::new(reader.clone())),
		Arc::new(TxResultsSourceFactory::new(reader)),
	];

	let registry = HttpSchemaRegistry::new(
		http_client.clone(),
		config.schema_registry.url.clone(),
		config.schema_registry.username.clone(),
		config.schema_registry.password.clone(),
	);
	let transmission_schema = registry
		.ensure_schema(
			&value_subject(&config.kafka.transmission_topic),
			TRANSMISSION_SCHEMA,
		)
		.await
		.context("failed to ensure the transmission schema")?;
	let config_set_schema = registry
		.ensure_schema(
			&value_subject(&config.kafka.config_set_simplified_topic),
			CONFIG_SET_SIMPLIFIED_SCHEMA,
		)
		.await
		.context("failed to ensure the config set schema")?;

	let producer =
		Arc::new(KafkaProducer::new(&config.kafka).context("failed to create the Kafka producer")?);

	let exporter_factories: Vec<Arc<dyn ExporterFactory>> = vec![
		Arc::new(PrometheusExporterFactory::new(metrics)),
		Arc::new(KafkaExporterFactory::new(
			producer,
			config.kafka.transmission_topic.clone(),
			transmission_schema,
			config.kafka.config_set_simplified_topic.clone(),
			config_set_schema,
		)),
	];

	let multi = Arc::new(MultiFeedMonitor::new(
		config.chain.clone(),
		source_factories,
		exporter_factories,
	));
	let run_generation: GenerationRunner = Arc::new(move |shutdown, feeds| {
		let multi = multi.clone();
		tokio::spawn(async move { multi.run(shutdown, feeds).await })
	});

	let shared_feeds: SharedFeedList = Arc::new(Mutex::new(Vec::new()));
	let manager = Manager::new(shared_feeds.clone(), run_generation);

	let rdd_source: Arc<dyn Source<Vec<FeedConfig>>> = if config.feature.test_only_fake_rdd {
		warn!("FEATURE_TEST_ONLY_FAKE_RDD is set; using the fake feed directory");
		Arc::new(FakeRddSource::new(vec![fake_feed()]))
	} else {
		Arc::new(RddSource::new(http_client, config.feeds.url.clone()))
	};

	let (feed_lists_tx, feed_lists_rx) = mpsc::channel(1);
	let rdd_poller = Poller::new(
		rdd_source,
		config.feeds.rdd_poll_interval,
		config.feeds.rdd_read_timeout,
		feed_lists_tx,
	);

	info!(
		"Pipeline initialized for network {} ({})",
		config.chain.network_name, config.chain.network_id
	);

	Ok(Pipeline {
		shared_feeds,
		rdd_poller,
		feed_lists_rx,
		manager,
	})
}

/// The single feed served by the fake feed directory.
fn fake_feed() -> FeedConfig {
	let contract_address_bytes = Address::repeat_byte(0x42);
	FeedConfig {
		id: "fake-eth-usd".to_string(),
		name: "FAKE ETH / USD".to_string(),
		path: "fake-eth-usd".to_string(),
		symbol: "$".to_string(),
		heartbeat: Duration::from_secs(600),
		contract_type: "ocr2".to_string(),
		status: "testing".to_string(),
		contract_address: format!("{contract_address_bytes:#x}"),
		contract_address_bytes,
		multiply: U256::from(100_000_000u64),
	}
}
