//! Full pipeline over the fake chain reader: sources, pollers, monitors and
//! both exporters, end to end.

use std::sync::Arc;
use std::time::Duration;

use apache_avro::types::Value;
use apache_avro::{from_avro_datum, Schema};
use tokio::sync::watch;
use tokio::time::timeout;

use feed_telemetry::services::exporter::{
	Exporter, ExporterFactory, KafkaExporter, KafkaExporterFactory, PrometheusExporterFactory,
};
use feed_telemetry::services::kafka::{
	RegisteredSchema, CONFIG_SET_SIMPLIFIED_SCHEMA, TRANSMISSION_SCHEMA,
};
use feed_telemetry::services::monitor::MultiFeedMonitor;
use feed_telemetry::services::source::{
	EnvelopeSourceFactory, FakeChainReader, SourceFactory, TxResultsSourceFactory,
};
use feed_telemetry::models::FeedUpdate;
use feed_telemetry::utils::metrics::Metrics;

use crate::integration::mocks::{test_chain, test_envelope, test_feed, CapturingProducer};

fn registered(topic: &str, id: u32, schema_json: &str) -> RegisteredSchema {
	RegisteredSchema {
		subject: format!("{topic}-value"),
		id,
		schema: Schema::parse_str(schema_json).unwrap(),
	}
}

#[tokio::test]
async fn fake_pipeline_exports_to_prometheus_and_kafka() {
	let metrics = Arc::new(Metrics::new().unwrap());
	let producer = CapturingProducer::new();

	let reader = Arc::new(FakeChainReader::default());
	let source_factories: Vec<Arc<dyn SourceFactory>> = vec![
		Arc::new(EnvelopeSourceFactory::new(reader.clone())),
		Arc::new(TxResultsSourceFactory::new(reader)),
	];
	let exporter_factories: Vec<Arc<dyn ExporterFactory>> = vec![
		Arc::new(PrometheusExporterFactory::new(metrics.clone())),
		Arc::new(KafkaExporterFactory::new(
			producer.clone(),
			"transmission".to_string(),
			registered("transmission", 1, TRANSMISSION_SCHEMA),
			"config_set_simplified".to_string(),
			registered("config_set_simplified", 2, CONFIG_SET_SIMPLIFIED_SCHEMA),
		)),
	];

	let multi = MultiFeedMonitor::new(test_chain(), source_factories, exporter_factories);
	let feed = test_feed("eth-usd", 0x11);
	let contract_key = feed.contract_address_bytes.to_vec();

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let handle = tokio::spawn(async move { multi.run(shutdown_rx, vec![feed]).await });

	tokio::time::sleep(Duration::from_millis(150)).await;
	shutdown_tx.send(true).unwrap();
	timeout(Duration::from_secs(2), handle)
		.await
		.expect("pipeline did not stop")
		.unwrap();

	// Prometheus side: head, answers and transaction counters all populated.
	let text = String::from_utf8(metrics.gather().unwrap()).unwrap();
	assert!(text.contains("head_tracker_current_head"));
	assert!(text.contains("offchain_aggregator_answers_total"));
	assert!(text.contains("feed_contract_transactions_succeeded"));

	// Kafka side: both topics received framed messages keyed by contract.
	let sent = producer.sent.lock().unwrap();
	assert!(sent.iter().any(|(topic, _, _)| topic == "transmission"));
	assert!(sent
		.iter()
		.any(|(topic, _, _)| topic == "config_set_simplified"));
	for (_, key, payload) in sent.iter() {
		assert_eq!(key, &contract_key);
		assert_eq!(payload[0], 0);
	}
}

#[tokio::test]
async fn kafka_payloads_decode_with_the_registered_schema() {
	let producer = CapturingProducer::new();
	let transmission = registered("transmission", 1, TRANSMISSION_SCHEMA);
	let exporter = KafkaExporter::new(
		producer.clone(),
		test_chain(),
		test_feed("eth-usd", 0x11),
		"transmission".to_string(),
		transmission.clone(),
		"config_set_simplified".to_string(),
		registered("config_set_simplified", 2, CONFIG_SET_SIMPLIFIED_SCHEMA),
	);

	let envelope = test_envelope(250_000_000_000, 1_700_000_000);
	exporter
		.export(FeedUpdate::Envelope(envelope.clone()))
		.await
		.unwrap();

	let sent = producer.sent.lock().unwrap();
	let (_, _, payload) = sent
		.iter()
		.find(|(topic, _, _)| topic == "transmission")
		.expect("no transmission message");

	assert_eq!(payload[0], 0);
	assert_eq!(&payload[1..5], &1u32.to_be_bytes());

	let decoded = from_avro_datum(&transmission.schema, &mut &payload[5..], None).unwrap();
	let Value::Record(fields) = decoded else {
		panic!("expected record");
	};
	let Some((_, Value::Record(answer))) = fields.iter().find(|(name, _)| name == "answer")
	else {
		panic!("expected answer record");
	};
	let Some((_, Value::Long(timestamp))) = answer.iter().find(|(name, _)| name == "timestamp")
	else {
		panic!("expected timestamp");
	};
	assert_eq!(*timestamp, 1_700_000_000);
	let Some((_, Value::Bytes(data))) = answer.iter().find(|(name, _)| name == "data") else {
		panic!("expected answer data");
	};
	assert_eq!(data, &envelope.latest_answer.to_be_bytes::<32>().to_vec());
}
