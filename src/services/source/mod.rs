//! Data sources.
//!
//! A [`Source`] produces one value per [`Source::fetch`] call. Concrete
//! sources read a feed's on-chain state through a [`ChainReader`] or fetch
//! the feed list from the feed-directory HTTP endpoint. Fake implementations
//! back the `FEATURE_TEST_ONLY_FAKE_*` switches.

mod chain;
mod fakes;
mod rdd;
mod rpc;

pub use chain::{
	ChainReader, EnvelopeSource, EnvelopeSourceFactory, TransmissionDetails, TxResultsSource,
	TxResultsSourceFactory,
};
pub use fakes::{FakeChainReader, FakeRddSource};
pub use rdd::RddSource;
pub use rpc::RpcChainReader;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ChainConfig, FeedConfig, FeedParseError, FeedUpdate};

#[derive(Debug, Error)]
pub enum SourceError {
	#[error("Chain read failed: {0}")]
	ChainRead(String),

	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest_middleware::Error),

	#[error("HTTP response error: {0}")]
	Response(#[from] reqwest::Error),

	#[error(transparent)]
	FeedParse(#[from] FeedParseError),

	#[error("Failed to construct source: {0}")]
	Construction(String),
}

/// A pull-based producer of one value per fetch.
#[async_trait]
pub trait Source<T>: Send + Sync {
	async fn fetch(&self) -> Result<T, SourceError>;
}

/// Builds the per-feed update sources for one (chain, feed) pair.
/// Construction failures are logged by the caller and cause that one feed to
/// be skipped.
pub trait SourceFactory: Send + Sync {
	fn make_source(
		&self,
		chain: &ChainConfig,
		feed: &FeedConfig,
	) -> Result<Arc<dyn Source<FeedUpdate>>, SourceError>;
}
