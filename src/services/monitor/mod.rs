//! Monitoring pipeline assembly.
//!
//! A [`FeedMonitor`] fans one feed's updates out to its exporters. A
//! [`MultiFeedMonitor`] runs one monitor (plus its pollers) per feed. The
//! [`Manager`] restarts the whole set whenever the feed directory changes.

mod feed;
mod manager;
mod multi;

pub use feed::FeedMonitor;
pub use manager::{GenerationRunner, Manager};
pub use multi::MultiFeedMonitor;

use std::sync::{Arc, Mutex};

use crate::models::FeedConfig;

/// The feed list currently being monitored, shared with the debug endpoint.
pub type SharedFeedList = Arc<Mutex<Vec<FeedConfig>>>;
