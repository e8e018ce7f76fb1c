//! Manager-driven restarts over the real monitor assembly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use feed_telemetry::models::{ChainConfig, FeedConfig};
use feed_telemetry::services::exporter::{
	Exporter, ExporterError, ExporterFactory, PrometheusExporterFactory,
};
use feed_telemetry::services::monitor::{
	GenerationRunner, Manager, MultiFeedMonitor, SharedFeedList,
};
use feed_telemetry::services::source::{
	EnvelopeSourceFactory, FakeChainReader, SourceFactory, TxResultsSourceFactory,
};
use feed_telemetry::utils::metrics::Metrics;

use crate::integration::mocks::{test_chain, test_feed, MockExporter};

fn source_factories() -> Vec<Arc<dyn SourceFactory>> {
	let reader = Arc::new(FakeChainReader::default());
	vec![
		Arc::new(EnvelopeSourceFactory::new(reader.clone())),
		Arc::new(TxResultsSourceFactory::new(reader)),
	]
}

fn generation_runner(
	chain: ChainConfig,
	exporter_factories: Vec<Arc<dyn ExporterFactory>>,
) -> GenerationRunner {
	let multi = Arc::new(MultiFeedMonitor::new(
		chain,
		source_factories(),
		exporter_factories,
	));
	Arc::new(move |shutdown, feeds| {
		let multi = multi.clone();
		tokio::spawn(async move { multi.run(shutdown, feeds).await })
	})
}

async fn send_and_settle(feeds_tx: &mpsc::Sender<Vec<FeedConfig>>, feeds: Vec<FeedConfig>) {
	feeds_tx.send(feeds).await.unwrap();
	tokio::time::sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn restart_cleans_up_removed_feed_series() {
	let metrics = Arc::new(Metrics::new().unwrap());
	let shared: SharedFeedList = Arc::new(Mutex::new(Vec::new()));
	let runner = generation_runner(
		test_chain(),
		vec![Arc::new(PrometheusExporterFactory::new(metrics.clone()))],
	);
	let manager = Manager::new(shared.clone(), runner);

	let (feeds_tx, feeds_rx) = mpsc::channel(4);
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let handle = tokio::spawn(manager.run(feeds_rx, shutdown_rx));

	send_and_settle(&feeds_tx, vec![test_feed("eth-usd", 0x11), test_feed("btc-usd", 0x22)])
		.await;
	let text = String::from_utf8(metrics.gather().unwrap()).unwrap();
	assert!(text.contains("feed_id=\"eth-usd\""));
	assert!(text.contains("feed_id=\"btc-usd\""));

	send_and_settle(&feeds_tx, vec![test_feed("eth-usd", 0x11)]).await;
	let text = String::from_utf8(metrics.gather().unwrap()).unwrap();
	assert!(text.contains("feed_id=\"eth-usd\""));
	assert!(!text.contains("feed_id=\"btc-usd\""));

	let shared_ids: Vec<String> = shared.lock().unwrap().iter().map(|f| f.id.clone()).collect();
	assert_eq!(shared_ids, vec!["eth-usd".to_string()]);

	shutdown_tx.send(true).unwrap();
	timeout(Duration::from_secs(2), handle)
		.await
		.expect("manager did not stop")
		.unwrap();
}

struct MockExporterFactory;

impl ExporterFactory for MockExporterFactory {
	fn make_exporter(
		&self,
		_chain: &ChainConfig,
		_feed: &FeedConfig,
	) -> Result<Arc<dyn Exporter>, ExporterError> {
		let mut mock = MockExporter::new();
		mock.expect_export().returning(|_| Ok(()));
		// Verified when the mock drops at the end of the test.
		mock.expect_cleanup().times(1).returning(|| ());
		Ok(Arc::new(mock))
	}
}

#[tokio::test]
async fn shutdown_cleans_up_every_exporter_once() {
	let shared: SharedFeedList = Arc::new(Mutex::new(Vec::new()));
	let runner = generation_runner(test_chain(), vec![Arc::new(MockExporterFactory)]);
	let manager = Manager::new(shared, runner);

	let (feeds_tx, feeds_rx) = mpsc::channel(4);
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let handle = tokio::spawn(manager.run(feeds_rx, shutdown_rx));

	send_and_settle(&feeds_tx, vec![test_feed("eth-usd", 0x11)]).await;

	shutdown_tx.send(true).unwrap();
	timeout(Duration::from_secs(2), handle)
		.await
		.expect("manager did not stop")
		.unwrap();
}
