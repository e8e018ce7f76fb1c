//! Core domain models.

mod chain;
mod envelope;
mod feed;

pub use chain::ChainConfig;
pub use envelope::{ContractConfig, Envelope, FeedUpdate, TxResults};
pub use feed::{parse_feed_list, FeedConfig, FeedParseError};
