//! Confluent-style schema registry client.
//!
//! Schemas are ensured once at startup, per topic: fetch the latest
//! registered version for the `<topic>-value` subject, compare it
//! structurally (as JSON) against ours, and register a new version only
//! when they differ.

use apache_avro::Schema;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::Url;

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest_middleware::Error),

	#[error("HTTP response error: {0}")]
	Response(#[from] reqwest::Error),

	#[error("Invalid Avro schema: {0}")]
	Avro(#[from] apache_avro::Error),

	#[error("Invalid schema JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Schema registry returned status {status} for subject {subject}")]
	Status { subject: String, status: StatusCode },
}

/// A schema known to the registry, ready for encoding.
#[derive(Debug, Clone)]
pub struct RegisteredSchema {
	pub subject: String,
	pub id: u32,
	pub schema: Schema,
}

/// Subject naming convention for message values.
pub fn value_subject(topic: &str) -> String {
	format!("{topic}-value")
}

#[async_trait]
pub trait SchemaRegistry: Send + Sync {
	/// Returns a registered schema for the subject: the existing one when it
	/// is structurally equal to `schema_json`, a freshly registered version
	/// otherwise.
	async fn ensure_schema(
		&self,
		subject: &str,
		schema_json: &str,
	) -> Result<RegisteredSchema, RegistryError>;
}

#[derive(Debug, Deserialize)]
struct LatestVersionResponse {
	id: u32,
	schema: String,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
	id: u32,
}

/// Client for a Confluent-compatible schema registry over HTTP.
pub struct HttpSchemaRegistry {
	client: ClientWithMiddleware,
	base_url: Url,
	username: Option<String>,
	password: Option<String>,
}

impl HttpSchemaRegistry {
	pub fn new(
		client: ClientWithMiddleware,
		base_url: Url,
		username: Option<String>,
		password: Option<String>,
	) -> Self {
		Self {
			client,
			base_url,
			username,
			password,
		}
	}

	fn with_auth(
		&self,
		request: reqwest_middleware::RequestBuilder,
	) -> reqwest_middleware::RequestBuilder {
		match &self.username {
			Some(username) => request.basic_auth(username, self.password.as_ref()),
			None => request,
		}
	}

	async fn latest_version(
		&self,
		subject: &str,
	) -> Result<Option<LatestVersionResponse>, RegistryError> {
		let url = format!(
			"{}/subjects/{}/versions/latest",
			self.base_url.as_str().trim_end_matches('/'),
			subject
		);
		let response = self.with_auth(self.client.get(&url)).send().await?;

		match response.status() {
			StatusCode::NOT_FOUND => Ok(None),
			status if status.is_success() => Ok(Some(response.json().await?)),
			status => Err(RegistryError::Status {
				subject: subject.to_string(),
				status,
			}),
		}
	}

	async fn register(&self, subject: &str, schema_json: &str) -> Result<u32, RegistryError> {
		let url = format!(
			"{}/subjects/{}/versions",
			self.base_url.as_str().trim_end_matches('/'),
			subject
		);
		let body = serde_json::json!({ "schema": schema_json });
		let response = self
			.with_auth(self.client.post(&url))
			.json(&body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(RegistryError::Status {
				subject: subject.to_string(),
				status: response.status(),
			});
		}
		let registered: RegisterResponse = response.json().await?;
		Ok(registered.id)
	}
}

#[async_trait]
impl SchemaRegistry for HttpSchemaRegistry {
	async fn ensure_schema(
		&self,
		subject: &str,
		schema_json: &str,
	) -> Result<RegisteredSchema, RegistryError> {
		let schema = Schema::parse_str(schema_json)?;
		let ours: serde_json::Value = serde_json::from_str(schema_json)?;

		if let Some(latest) = self.latest_version(subject).await? {
			let theirs: serde_json::Value = serde_json::from_str(&latest.schema)?;
			if ours == theirs {
				info!(
					"Schema for subject {} already registered with id {}",
					subject, latest.id
				);
				return Ok(RegisteredSchema {
					subject: subject.to_string(),
					id: latest.id,
					schema,
				});
			}
		}

		let id = self.register(subject, schema_json).await?;
		info!("Registered schema for subject {} with id {}", subject, id);
		Ok(RegisteredSchema {
			subject: subject.to_string(),
			id,
			schema,
		})
	}
}
