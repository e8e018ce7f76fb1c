//! Monitor lifecycle manager.
//!
//! The manager owns the currently running monitor generation. Whenever the
//! feed directory delivers a list that differs structurally from the one in
//! effect, the old generation is shut down and fully drained before the new
//! one starts, so no two generations ever export concurrently.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::SharedFeedList;
use crate::models::FeedConfig;

/// Starts one monitor generation for a feed list; the returned handle
/// resolves when the generation has fully stopped after its shutdown signal.
pub type GenerationRunner =
	Arc<dyn Fn(watch::Receiver<bool>, Vec<FeedConfig>) -> JoinHandle<()> + Send + Sync>;

struct Generation {
	feeds: Vec<FeedConfig>,
	shutdown_tx: watch::Sender<bool>,
	handle: JoinHandle<()>,
}

pub struct Manager {
	shared_feeds: SharedFeedList,
	run_generation: GenerationRunner,
}

impl Manager {
	pub fn new(shared_feeds: SharedFeedList, run_generation: GenerationRunner) -> Self {
		Self {
			shared_feeds,
			run_generation,
		}
	}

	/// Consumes feed lists until shutdown. Identical consecutive lists are
	/// ignored; a changed list restarts the monitors.
	pub async fn run(
		self,
		mut feed_lists: mpsc::Receiver<Vec<FeedConfig>>,
		mut shutdown: watch::Receiver<bool>,
	) {
		let mut current: Option<Generation> = None;

		loop {
			tokio::select! {
				_ = shutdown.changed() => break,
				maybe_feeds = feed_lists.recv() => match maybe_feeds {
					None => break,
					Some(feeds) => {
						if current.as_ref().is_some_and(|g| g.feeds == feeds) {
							continue;
						}
						if let Some(generation) = current.take() {
							info!(
								"Feed list changed ({} feeds), restarting monitors",
								feeds.len()
							);
							Self::stop(generation).await;
						} else {
							info!("Starting monitors for {} feeds", feeds.len());
						}
						current = Some(self.start(feeds));
					}
				},
			}
		}

		if let Some(generation) = current.take() {
			Self::stop(generation).await;
		}
	}

	fn start(&self, feeds: Vec<FeedConfig>) -> Generation {
		if let Ok(mut shared) = self.shared_feeds.lock() {
			*shared = feeds.clone();
		}
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let handle = (self.run_generation)(shutdown_rx, feeds.clone());
		Generation {
			feeds,
			shutdown_tx,
			handle,
		}
	}

	async fn stop(generation: Generation) {
		let _ = generation.shutdown_tx.send(true);
		if let Err(e) = generation.handle.await {
			error!("Monitor generation task failed: {}", e);
		}
	}
}
