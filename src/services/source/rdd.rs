//! Feed directory (RDD) source.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use super::{Source, SourceError};
use crate::models::{parse_feed_list, FeedConfig};

/// Fetches the current feed list from the feed-directory HTTP endpoint.
pub struct RddSource {
	client: ClientWithMiddleware,
	url: Url,
}

impl RddSource {
	pub fn new(client: ClientWithMiddleware, url: Url) -> Self {
		Self { client, url }
	}
}

#[async_trait]
impl Source<Vec<FeedConfig>> for RddSource {
	async fn fetch(&self) -> Result<Vec<FeedConfig>, SourceError> {
		let response = self
			.client
			.get(self.url.clone())
			.send()
			.await?
			.error_for_status()?;
		let body = response.bytes().await?;
		Ok(parse_feed_list(&body)?)
	}
}
