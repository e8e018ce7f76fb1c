//! Interval poller over a [`Source`].
//!
//! One poller owns one source and fetches it on a fixed interval, pushing
//! each successful result into its update channel. Fetches are strictly
//! sequential: the next fetch starts only after the previous one finished
//! (or timed out) and its result was handed to the channel.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::warn;

use crate::services::source::Source;

pub struct Poller<T> {
	source: Arc<dyn Source<T>>,
	poll_interval: Duration,
	fetch_timeout: Duration,
	updates_tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> Poller<T> {
	/// Creates a poller feeding the given channel. Several pollers may share
	/// one sender to fan in to a single consumer.
	///
	/// The channel is bounded: when the buffer is full, the poller blocks on
	/// the send until the reader drains or shutdown fires, so a slow
	/// consumer throttles the poll rate.
	pub fn new(
		source: Arc<dyn Source<T>>,
		poll_interval: Duration,
		fetch_timeout: Duration,
		updates_tx: mpsc::Sender<T>,
	) -> Self {
		Self {
			source,
			poll_interval,
			fetch_timeout,
			updates_tx,
		}
	}

	/// Runs the poll loop until shutdown. Performs one immediate fetch on
	/// start, then one fetch per interval tick. Fetch errors and timeouts
	/// are logged and the loop continues; nothing is surfaced to the caller.
	pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
		if self.poll_once(&mut shutdown).await.is_break() {
			return;
		}

		let mut ticker = interval(self.poll_interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		// The first tick of a fresh interval fires immediately; the
		// immediate fetch above already covered it.
		ticker.tick().await;

		loop {
			tokio::select! {
				_ = shutdown.changed() => return,
				_ = ticker.tick() => {
					if self.poll_once(&mut shutdown).await.is_break() {
						return;
					}
				}
			}
		}
	}

	async fn poll_once(&self, shutdown: &mut watch::Receiver<bool>) -> ControlFlow<()> {
		match timeout(self.fetch_timeout, self.source.fetch()).await {
			Err(_) => {
				warn!("Fetch timed out after {:?}", self.fetch_timeout);
				ControlFlow::Continue(())
			}
			Ok(Err(e)) => {
				warn!("Fetch failed: {}", e);
				ControlFlow::Continue(())
			}
			Ok(Ok(update)) => {
				tokio::select! {
					result = self.updates_tx.send(update) => {
						if result.is_err() {
							// Receiver dropped; nothing left to feed.
							ControlFlow::Break(())
						} else {
							ControlFlow::Continue(())
						}
					}
					_ = shutdown.changed() => ControlFlow::Break(()),
				}
			}
		}
	}
}
