//! Prometheus exporter.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, I256, U256};
use async_trait::async_trait;

use super::{Exporter, ExporterError, ExporterFactory};
use crate::models::{ChainConfig, Envelope, FeedConfig, FeedUpdate};
use crate::utils::metrics::{FeedLabels, Metrics};

/// Converts a chain integer to an f64 through its decimal representation.
/// Precision is capped at f64's 53 bits, which is what a gauge can hold
/// anyway.
fn to_f64(decimal: &str) -> f64 {
	decimal.parse::<f64>().unwrap_or(0.0)
}

fn humanize(raw: f64, multiply: &U256) -> f64 {
	let divisor = to_f64(&multiply.to_string());
	if divisor > 0.0 {
		raw / divisor
	} else {
		raw
	}
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Publishes one feed's updates into the shared [`Metrics`] object.
pub struct PrometheusExporter {
	metrics: Arc<Metrics>,
	chain: ChainConfig,
	feed: FeedConfig,
	labels: FeedLabels,
	/// Last observed (answer, timestamp) pair; a transmission is counted as
	/// new only when the pair changes.
	last_transmission: Mutex<Option<(I256, u64)>>,
	/// Every transmitter observed for this feed, so cleanup can delete the
	/// per-sender series.
	seen_senders: Mutex<HashSet<Address>>,
}

impl PrometheusExporter {
	pub fn new(metrics: Arc<Metrics>, chain: ChainConfig, feed: FeedConfig) -> Self {
		let labels = FeedLabels::new(&chain, &feed);
		Self {
			metrics,
			chain,
			feed,
			labels,
			last_transmission: Mutex::new(None),
			seen_senders: Mutex::new(HashSet::new()),
		}
	}

	fn export_envelope(&self, envelope: &Envelope) {
		self.metrics.set_head(&self.chain, envelope.block_number);
		self.metrics.set_link_balance(
			&self.labels,
			to_f64(&envelope.link_balance.to_string()),
		);

		let observed = (envelope.latest_answer, envelope.latest_timestamp);
		let is_new = {
			let mut last = match self.last_transmission.lock() {
				Ok(guard) => guard,
				Err(poisoned) => poisoned.into_inner(),
			};
			let is_new = *last != Some(observed);
			*last = Some(observed);
			is_new
		};

		// A re-read of the same transmission only refreshes head, balance
		// and staleness; the transmission-specific series stay untouched.
		if is_new {
			let raw = to_f64(&envelope.latest_answer.to_string());
			let humanized = humanize(raw, &self.feed.multiply);
			self.metrics.set_answer(&self.labels, raw, humanized);
			self.metrics.inc_answers_total(&self.labels);

			let sender = format!("{:#x}", envelope.transmitter);
			self.metrics
				.set_submission(&self.labels, &sender, raw, humanized);
			if let Ok(mut senders) = self.seen_senders.lock() {
				senders.insert(envelope.transmitter);
			}
		}

		let stalled = unix_now().saturating_sub(envelope.latest_timestamp)
			> self.feed.heartbeat.as_secs();
		self.metrics.set_stalled(&self.labels, stalled);
	}
}

#[async_trait]
impl Exporter for PrometheusExporter {
	async fn export(&self, update: FeedUpdate) -> Result<(), ExporterError> {
		match update {
			FeedUpdate::Envelope(envelope) => self.export_envelope(&envelope),
			FeedUpdate::TxResults(results) => {
				self.metrics
					.add_tx_results(&self.labels, results.num_succeeded, results.num_failed);
			}
		}
		Ok(())
	}

	async fn cleanup(&self) {
		let senders: Vec<String> = self
			.seen_senders
			.lock()
			.map(|senders| senders.iter().map(|s| format!("{s:#x}")).collect())
			.unwrap_or_default();
		self.metrics.cleanup_feed(&self.labels, &senders);
	}
}

pub struct PrometheusExporterFactory {
	metrics: Arc<Metrics>,
}

impl PrometheusExporterFactory {
	pub fn new(metrics: Arc<Metrics>) -> Self {
		Self { metrics }
	}
}

impl ExporterFactory for PrometheusExporterFactory {
	fn make_exporter(
		&self,
		chain: &ChainConfig,
		feed: &FeedConfig,
	) -> Result<Arc<dyn Exporter>, ExporterError> {
		Ok(Arc::new(PrometheusExporter::new(
			self.metrics.clone(),
			chain.clone(),
			feed.clone(),
		)))
	}
}
