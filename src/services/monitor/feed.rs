//! Per-feed update fan-out.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, warn};

use crate::models::FeedUpdate;
use crate::services::exporter::Exporter;

const CLEANUP_TIMEOUT: Duration = Duration::from_secs(1);

/// Fans every update for one feed out to all of its exporters.
///
/// Exporters are isolated from each other: each export runs in its own task
/// and a panicking exporter only loses its own observation. All exports for
/// one update complete before the next update is taken, so a slow exporter
/// applies backpressure through the update channel.
pub struct FeedMonitor {
	feed_id: String,
	exporters: Vec<Arc<dyn Exporter>>,
}

impl FeedMonitor {
	pub fn new(feed_id: String, exporters: Vec<Arc<dyn Exporter>>) -> Self {
		Self { feed_id, exporters }
	}

	/// Consumes updates until shutdown fires or every sender is gone, then
	/// runs each exporter's cleanup exactly once.
	pub async fn run(
		self,
		mut updates: mpsc::Receiver<FeedUpdate>,
		mut shutdown: watch::Receiver<bool>,
	) {
		loop {
			tokio::select! {
				_ = shutdown.changed() => break,
				maybe_update = updates.recv() => match maybe_update {
					Some(update) => self.handle_update(update).await,
					None => break,
				},
			}
		}
		self.cleanup().await;
	}

	async fn handle_update(&self, update: FeedUpdate) {
		let mut tasks = JoinSet::new();
		for (index, exporter) in self.exporters.iter().enumerate() {
			let exporter = exporter.clone();
			let update = update.clone();
			tasks.spawn(async move {
				let result = AssertUnwindSafe(exporter.export(update)).catch_unwind().await;
				(index, result)
			});
		}

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((_, Ok(Ok(())))) => {}
				Ok((index, Ok(Err(e)))) => {
					warn!(
						"Exporter {} for feed {} failed to export: {}",
						index, self.feed_id, e
					);
				}
				Ok((index, Err(_))) => {
					error!(
						"Exporter {} for feed {} panicked during export",
						index, self.feed_id
					);
				}
				Err(e) => {
					error!("Export task for feed {} failed to join: {}", self.feed_id, e);
				}
			}
		}
	}

	async fn cleanup(&self) {
		let mut tasks = JoinSet::new();
		for (index, exporter) in self.exporters.iter().enumerate() {
			let exporter = exporter.clone();
			tasks.spawn(async move {
				let cleanup = AssertUnwindSafe(exporter.cleanup()).catch_unwind();
				(index, timeout(CLEANUP_TIMEOUT, cleanup).await)
			});
		}

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((_, Ok(Ok(())))) => {}
				Ok((index, Ok(Err(_)))) => {
					error!(
						"Exporter {} for feed {} panicked during cleanup",
						index, self.feed_id
					);
				}
				Ok((index, Err(_))) => {
					warn!(
						"Exporter {} for feed {} did not clean up within {:?}",
						index, self.feed_id, CLEANUP_TIMEOUT
					);
				}
				Err(e) => {
					error!("Cleanup task for feed {} failed to join: {}", self.feed_id, e);
				}
			}
		}
	}
}
