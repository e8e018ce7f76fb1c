//! Per-feed pipeline construction.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::FeedMonitor;
use crate::models::{ChainConfig, FeedConfig};
use crate::services::exporter::ExporterFactory;
use crate::services::poller::Poller;
use crate::services::source::SourceFactory;

/// Builds and runs the full pipeline for a set of feeds: one poller per
/// (feed, source factory) pair, all fanning in to one [`FeedMonitor`] per
/// feed.
pub struct MultiFeedMonitor {
	chain: ChainConfig,
	source_factories: Vec<Arc<dyn SourceFactory>>,
	exporter_factories: Vec<Arc<dyn ExporterFactory>>,
}

impl MultiFeedMonitor {
	pub fn new(
		chain: ChainConfig,
		source_factories: Vec<Arc<dyn SourceFactory>>,
		exporter_factories: Vec<Arc<dyn ExporterFactory>>,
	) -> Self {
		Self {
			chain,
			source_factories,
			exporter_factories,
		}
	}

	/// Runs monitors for every feed until shutdown. A feed whose sources or
	/// exporters cannot be constructed is logged and skipped; the rest of the
	/// feeds still run.
	pub async fn run(&self, shutdown: watch::Receiver<bool>, feeds: Vec<FeedConfig>) {
		let mut tasks = JoinSet::new();
		let mut started = 0usize;

		'feeds: for feed in feeds {
			let mut sources = Vec::with_capacity(self.source_factories.len());
			for factory in &self.source_factories {
				match factory.make_source(&self.chain, &feed) {
					Ok(source) => sources.push(source),
					Err(e) => {
						warn!("Skipping feed {}: failed to build source: {}", feed.id, e);
						continue 'feeds;
					}
				}
			}

			let mut exporters = Vec::with_capacity(self.exporter_factories.len());
			for factory in &self.exporter_factories {
				match factory.make_exporter(&self.chain, &feed) {
					Ok(exporter) => exporters.push(exporter),
					Err(e) => {
						warn!("Skipping feed {}: failed to build exporter: {}", feed.id, e);
						continue 'feeds;
					}
				}
			}

			let (updates_tx, updates_rx) = mpsc::channel(sources.len().max(1));
			for source in sources {
				let poller = Poller::new(
					source,
					self.chain.poll_interval,
					self.chain.read_timeout,
					updates_tx.clone(),
				);
				tasks.spawn(poller.run(shutdown.clone()));
			}
			drop(updates_tx);

			let monitor = FeedMonitor::new(feed.id.clone(), exporters);
			tasks.spawn(monitor.run(updates_rx, shutdown.clone()));
			started += 1;
		}

		info!("Started monitors for {} feeds", started);
		while tasks.join_next().await.is_some() {}
	}
}
