//! Domain models and data structures for feed monitoring.
//!
//! - `config`: environment-variable configuration loading
//! - `core`: core domain models (FeedConfig, ChainConfig, Envelope, TxResults)

mod config;
mod core;

pub use config::{
	parse_duration, Config, ConfigError, FeatureConfig, FeedsConfig, KafkaConfig,
	SchemaRegistryConfig,
};
pub use core::{
	parse_feed_list, ChainConfig, ContractConfig, Envelope, FeedConfig, FeedParseError, FeedUpdate,
	TxResults,
};
