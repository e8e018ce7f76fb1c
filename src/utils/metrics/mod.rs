//! Prometheus metrics for the application.
//!
//! All metrics hang off an explicit [`Metrics`] object that owns its own
//! `Registry` and is constructed once at startup, then injected into the
//! exporters and the HTTP server. Nothing registers into a global registry.

pub mod server;

use prometheus::{
	Encoder, Gauge, GaugeVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use sysinfo::System;

use crate::models::{ChainConfig, FeedConfig};

/// Label values identifying one feed on one network. Computed once per
/// exporter and reused for every update and for cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLabels {
	pub feed_id: String,
	pub feed_name: String,
	pub feed_path: String,
	pub symbol: String,
	pub contract_type: String,
	pub contract_status: String,
	pub network_id: String,
	pub network_name: String,
}

impl FeedLabels {
	pub fn new(chain: &ChainConfig, feed: &FeedConfig) -> Self {
		FeedLabels {
			feed_id: feed.id.clone(),
			feed_name: feed.name.clone(),
			feed_path: feed.path.clone(),
			symbol: feed.symbol.clone(),
			contract_type: feed.contract_type.clone(),
			contract_status: feed.status.clone(),
			network_id: chain.network_id.clone(),
			network_name: chain.network_name.clone(),
		}
	}

	fn values(&self) -> [&str; 8] {
		[
			&self.feed_id,
			&self.feed_name,
			&self.feed_path,
			&self.symbol,
			&self.contract_type,
			&self.contract_status,
			&self.network_id,
			&self.network_name,
		]
	}

	fn values_with_sender<'a>(&'a self, sender: &'a str) -> [&'a str; 9] {
		[
			&self.feed_id,
			&self.feed_name,
			&self.feed_path,
			&self.symbol,
			&self.contract_type,
			&self.contract_status,
			&self.network_id,
			&self.network_name,
			sender,
		]
	}
}

const FEED_LABEL_NAMES: [&str; 8] = [
	"feed_id",
	"feed_name",
	"feed_path",
	"symbol",
	"contract_type",
	"contract_status",
	"network_id",
	"network_name",
];

const SUBMISSION_LABEL_NAMES: [&str; 9] = [
	"feed_id",
	"feed_name",
	"feed_path",
	"symbol",
	"contract_type",
	"contract_status",
	"network_id",
	"network_name",
	"sender",
];

/// The full metric battery of the service.
pub struct Metrics {
	registry: Registry,

	head_tracker_current_head: IntGaugeVec,
	link_balance: GaugeVec,
	answers_raw: GaugeVec,
	answers: GaugeVec,
	answers_total: IntCounterVec,
	submission_received_values_raw: GaugeVec,
	submission_received_values: GaugeVec,
	answer_stalled: IntGaugeVec,
	transactions_succeeded: IntCounterVec,
	transactions_failed: IntCounterVec,

	cpu_usage: Gauge,
	memory_usage: Gauge,
	total_memory: Gauge,
	memory_usage_percent: Gauge,
}

impl Metrics {
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();

		let head_tracker_current_head = IntGaugeVec::new(
			Opts::new(
				"head_tracker_current_head",
				"Tracks the current block height that the monitoring instance has processed",
			),
			&["network_name", "network_id", "chain_id"],
		)?;
		registry.register(Box::new(head_tracker_current_head.clone()))?;

		let link_balance = GaugeVec::new(
			Opts::new("link_balance", "LINK balance of the feed contract"),
			&FEED_LABEL_NAMES,
		)?;
		registry.register(Box::new(link_balance.clone()))?;

		let answers_raw = GaugeVec::new(
			Opts::new(
				"offchain_aggregator_answers_raw",
				"Latest answer as reported on chain",
			),
			&FEED_LABEL_NAMES,
		)?;
		registry.register(Box::new(answers_raw.clone()))?;

		let answers = GaugeVec::new(
			Opts::new(
				"offchain_aggregator_answers",
				"Latest answer divided by the feed's multiply value",
			),
			&FEED_LABEL_NAMES,
		)?;
		registry.register(Box::new(answers.clone()))?;

		let answers_total = IntCounterVec::new(
			Opts::new(
				"offchain_aggregator_answers_total",
				"Count of new transmissions observed for the feed",
			),
			&FEED_LABEL_NAMES,
		)?;
		registry.register(Box::new(answers_total.clone()))?;

		let submission_received_values_raw = GaugeVec::new(
			Opts::new(
				"offchain_aggregator_submission_received_values_raw",
				"Latest answer attributed to the transmitting oracle, raw",
			),
			&SUBMISSION_LABEL_NAMES,
		)?;
		registry.register(Box::new(submission_received_values_raw.clone()))?;

		let submission_received_values = GaugeVec::new(
			Opts::new(
				"offchain_aggregator_submission_received_values",
				"Latest answer attributed to the transmitting oracle, humanized",
			),
			&SUBMISSION_LABEL_NAMES,
		)?;
		registry.register(Box::new(submission_received_values.clone()))?;

		let answer_stalled = IntGaugeVec::new(
			Opts::new(
				"offchain_aggregator_answer_stalled",
				"Set to 1 when the time since the latest transmission exceeds the heartbeat",
			),
			&FEED_LABEL_NAMES,
		)?;
		registry.register(Box::new(answer_stalled.clone()))?;

		let transactions_succeeded = IntCounterVec::new(
			Opts::new(
				"feed_contract_transactions_succeeded",
				"Count of successful transactions observed for the feed",
			),
			&FEED_LABEL_NAMES,
		)?;
		registry.register(Box::new(transactions_succeeded.clone()))?;

		let transactions_failed = IntCounterVec::new(
			Opts::new(
				"feed_contract_transactions_failed",
				"Count of failed transactions observed for the feed",
			),
			&FEED_LABEL_NAMES,
		)?;
		registry.register(Box::new(transactions_failed.clone()))?;

		let cpu_usage = Gauge::new("cpu_usage_percentage", "Current CPU usage percentage")?;
		registry.register(Box::new(cpu_usage.clone()))?;

		let memory_usage = Gauge::new("memory_usage_bytes", "Memory usage in bytes")?;
		registry.register(Box::new(memory_usage.clone()))?;

		let total_memory = Gauge::new("total_memory_bytes", "Total memory in bytes")?;
		registry.register(Box::new(total_memory.clone()))?;

		let memory_usage_percent = Gauge::new("memory_usage_percentage", "Memory usage percentage")?;
		registry.register(Box::new(memory_usage_percent.clone()))?;

		Ok(Metrics {
			registry,
			head_tracker_current_head,
			link_balance,
			answers_raw,
			answers,
			answers_total,
			submission_received_values_raw,
			submission_received_values,
			answer_stalled,
			transactions_succeeded,
			transactions_failed,
			cpu_usage,
			memory_usage,
			total_memory,
			memory_usage_percent,
		})
	}

	pub fn set_head(&self, chain: &ChainConfig, height: u64) {
		self.head_tracker_current_head
			.with_label_values(&[&chain.network_name, &chain.network_id, &chain.chain_id])
			.set(height as i64);
	}

	pub fn set_link_balance(&self, labels: &FeedLabels, balance: f64) {
		self.link_balance
			.with_label_values(&labels.values())
			.set(balance);
	}

	pub fn set_answer(&self, labels: &FeedLabels, raw: f64, humanized: f64) {
		self.answers_raw.with_label_values(&labels.values()).set(raw);
		self.answers
			.with_label_values(&labels.values())
			.set(humanized);
	}

	pub fn inc_answers_total(&self, labels: &FeedLabels) {
		self.answers_total.with_label_values(&labels.values()).inc();
	}

	pub fn set_submission(&self, labels: &FeedLabels, sender: &str, raw: f64, humanized: f64) {
		self.submission_received_values_raw
			.with_label_values(&labels.values_with_sender(sender))
			.set(raw);
		self.submission_received_values
			.with_label_values(&labels.values_with_sender(sender))
			.set(humanized);
	}

	pub fn set_stalled(&self, labels: &FeedLabels, stalled: bool) {
		self.answer_stalled
			.with_label_values(&labels.values())
			.set(if stalled { 1 } else { 0 });
	}

	pub fn add_tx_results(&self, labels: &FeedLabels, num_succeeded: u64, num_failed: u64) {
		self.transactions_succeeded
			.with_label_values(&labels.values())
			.inc_by(num_succeeded);
		self.transactions_failed
			.with_label_values(&labels.values())
			.inc_by(num_failed);
	}

	/// Reads the current transmissions counter, used by tests to assert the
	/// duplicate-detection behavior.
	pub fn answers_total_value(&self, labels: &FeedLabels) -> u64 {
		self.answers_total.with_label_values(&labels.values()).get()
	}

	/// Deletes every label combination recorded for one feed, including the
	/// per-sender submission series for every sender ever observed.
	pub fn cleanup_feed(&self, labels: &FeedLabels, senders: &[String]) {
		let values = labels.values();
		// remove_label_values errors when the series was never written;
		// nothing to do about that during teardown.
		let _ = self.link_balance.remove_label_values(&values);
		let _ = self.answers_raw.remove_label_values(&values);
		let _ = self.answers.remove_label_values(&values);
		let _ = self.answers_total.remove_label_values(&values);
		let _ = self.answer_stalled.remove_label_values(&values);
		let _ = self.transactions_succeeded.remove_label_values(&values);
		let _ = self.transactions_failed.remove_label_values(&values);
		for sender in senders {
			let with_sender = labels.values_with_sender(sender);
			let _ = self
				.submission_received_values_raw
				.remove_label_values(&with_sender);
			let _ = self
				.submission_received_values
				.remove_label_values(&with_sender);
		}
	}

	/// Encodes all registered metrics in the Prometheus text exposition
	/// format.
	pub fn gather(&self) -> Result<Vec<u8>, prometheus::Error> {
		let encoder = TextEncoder::new();
		let metric_families = self.registry.gather();
		let mut buffer = Vec::new();
		encoder.encode(&metric_families, &mut buffer)?;
		Ok(buffer)
	}

	/// Refreshes the process-level system metrics.
	pub fn update_system_metrics(&self) {
		let mut sys = System::new_all();
		sys.refresh_all();

		self.cpu_usage.set(sys.global_cpu_usage() as f64);

		let total_memory = sys.total_memory();
		let memory_usage = sys.used_memory();
		self.total_memory.set(total_memory as f64);
		self.memory_usage.set(memory_usage as f64);
		self.memory_usage_percent.set(if total_memory > 0 {
			(memory_usage as f64 / total_memory as f64) * 100.0
		} else {
			0.0
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	fn test_labels() -> FeedLabels {
		FeedLabels {
			feed_id: "eth-usd".into(),
			feed_name: "ETH / USD".into(),
			feed_path: "eth-usd".into(),
			symbol: "$".into(),
			contract_type: "ocr2".into(),
			contract_status: "live".into(),
			network_id: "ethereum-mainnet".into(),
			network_name: "mainnet".into(),
		}
	}

	fn test_chain() -> ChainConfig {
		ChainConfig {
			rpc_endpoint: "http://localhost:8545".into(),
			network_name: "mainnet".into(),
			network_id: "ethereum-mainnet".into(),
			chain_id: "1".into(),
			read_timeout: Duration::from_secs(2),
			poll_interval: Duration::from_secs(5),
		}
	}

	#[test]
	fn records_and_gathers() {
		let metrics = Metrics::new().unwrap();
		let labels = test_labels();

		metrics.set_head(&test_chain(), 1234);
		metrics.set_answer(&labels, 250000000000.0, 2500.0);
		metrics.inc_answers_total(&labels);
		metrics.set_submission(&labels, "0xabc", 250000000000.0, 2500.0);
		metrics.set_stalled(&labels, false);
		metrics.add_tx_results(&labels, 3, 1);

		let text = String::from_utf8(metrics.gather().unwrap()).unwrap();
		assert!(text.contains("head_tracker_current_head"));
		assert!(text.contains("offchain_aggregator_answers_total"));
		assert!(text.contains("sender=\"0xabc\""));
		assert_eq!(metrics.answers_total_value(&labels), 1);
	}

	#[test]
	fn cleanup_removes_feed_series() {
		let metrics = Metrics::new().unwrap();
		let labels = test_labels();

		metrics.set_answer(&labels, 1.0, 1.0);
		metrics.set_submission(&labels, "0xabc", 1.0, 1.0);

		metrics.cleanup_feed(&labels, &["0xabc".to_string()]);

		let text = String::from_utf8(metrics.gather().unwrap()).unwrap();
		assert!(!text.contains("feed_id=\"eth-usd\""));
	}
}
