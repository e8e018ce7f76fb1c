//! On-chain feed telemetry service.
//!
//! Polls a set of price feed contracts, assembles per-feed observation
//! envelopes, and exports them to Prometheus and Kafka. The feed set comes
//! from a feed-directory endpoint and the whole pipeline restarts whenever
//! that directory changes.

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;
