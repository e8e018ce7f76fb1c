//! Process configuration, read from environment variables.
//!
//! Every knob of the service is an environment variable (loaded through
//! `dotenvy` in the binary). Missing required variables and malformed
//! durations or URLs are fatal at startup.

use std::env::var;
use std::time::Duration;

use url::Url;

use crate::models::ChainConfig;

mod error;

pub use error::ConfigError;

/// Kafka producer settings.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
	pub brokers: String,
	pub client_id: String,
	pub security_protocol: String,
	pub sasl_mechanism: Option<String>,
	pub sasl_username: Option<String>,
	pub sasl_password: Option<String>,
	pub transmission_topic: String,
	pub config_set_simplified_topic: String,
}

/// Confluent-style schema registry settings.
#[derive(Debug, Clone)]
pub struct SchemaRegistryConfig {
	pub url: Url,
	pub username: Option<String>,
	pub password: Option<String>,
}

/// Feed directory (RDD) settings.
#[derive(Debug, Clone)]
pub struct FeedsConfig {
	pub url: Url,
	pub rdd_read_timeout: Duration,
	pub rdd_poll_interval: Duration,
}

/// Test-only feature switches. These swap the chain readers or the feed
/// directory for in-process fakes and must never be set in production.
#[derive(Debug, Clone, Default)]
pub struct FeatureConfig {
	pub test_only_fake_readers: bool,
	pub test_only_fake_rdd: bool,
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct Config {
	pub chain: ChainConfig,
	pub kafka: KafkaConfig,
	pub schema_registry: SchemaRegistryConfig,
	pub feeds: FeedsConfig,
	pub http_address: String,
	pub feature: FeatureConfig,
}

impl Config {
	/// Reads the full configuration from the environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		let chain = ChainConfig {
			rpc_endpoint: required("RPC_ENDPOINT")?,
			network_name: required("NETWORK_NAME")?,
			network_id: required("NETWORK_ID")?,
			chain_id: required("CHAIN_ID")?,
			read_timeout: duration_or("READ_TIMEOUT", Duration::from_secs(2))?,
			poll_interval: duration_or("POLL_INTERVAL", Duration::from_secs(5))?,
		};

		let kafka = KafkaConfig {
			brokers: required("KAFKA_BROKERS")?,
			client_id: required("KAFKA_CLIENT_ID")?,
			security_protocol: optional("KAFKA_SECURITY_PROTOCOL")
				.unwrap_or_else(|| "PLAINTEXT".to_string()),
			sasl_mechanism: optional("KAFKA_SASL_MECHANISM"),
			sasl_username: optional("KAFKA_SASL_USERNAME"),
			sasl_password: optional("KAFKA_SASL_PASSWORD"),
			transmission_topic: optional("KAFKA_TRANSMISSION_TOPIC")
				.unwrap_or_else(|| "transmission".to_string()),
			config_set_simplified_topic: optional("KAFKA_CONFIG_SET_SIMPLIFIED_TOPIC")
				.unwrap_or_else(|| "config_set_simplified".to_string()),
		};

		let schema_registry = SchemaRegistryConfig {
			url: required_url("SCHEMA_REGISTRY_URL")?,
			username: optional("SCHEMA_REGISTRY_USERNAME"),
			password: optional("SCHEMA_REGISTRY_PASSWORD"),
		};

		let feeds = FeedsConfig {
			url: required_url("FEEDS_URL")?,
			rdd_read_timeout: duration_or("FEEDS_RDD_READ_TIMEOUT", Duration::from_secs(1))?,
			rdd_poll_interval: duration_or("FEEDS_RDD_POLL_INTERVAL", Duration::from_secs(10))?,
		};

		Ok(Config {
			chain,
			kafka,
			schema_registry,
			feeds,
			http_address: optional("HTTP_ADDRESS").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
			feature: FeatureConfig {
				test_only_fake_readers: flag("FEATURE_TEST_ONLY_FAKE_READERS"),
				test_only_fake_rdd: flag("FEATURE_TEST_ONLY_FAKE_RDD"),
			},
		})
	}
}

fn required(name: &str) -> Result<String, ConfigError> {
	var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
}

fn optional(name: &str) -> Option<String> {
	var(name).ok().filter(|value| !value.is_empty())
}

fn flag(name: &str) -> bool {
	var(name).map(|value| value == "true").unwrap_or(false)
}

fn required_url(name: &str) -> Result<Url, ConfigError> {
	let value = required(name)?;
	Url::parse(&value).map_err(|e| ConfigError::InvalidUrl {
		var: name.to_string(),
		value,
		reason: e.to_string(),
	})
}

fn duration_or(name: &str, default: Duration) -> Result<Duration, ConfigError> {
	match optional(name) {
		Some(value) => {
			parse_duration(&value).ok_or_else(|| ConfigError::InvalidDuration {
				var: name.to_string(),
				value,
			})
		}
		None => Ok(default),
	}
}

/// Parses a duration of the form `<integer><unit>` where the unit is one of
/// `ms`, `s`, `m`, `h`.
pub fn parse_duration(value: &str) -> Option<Duration> {
	let value = value.trim();
	let (number, unit) = value.split_at(value.find(|c: char| !c.is_ascii_digit())?);
	let number: u64 = number.parse().ok()?;
	match unit {
		"ms" => Some(Duration::from_millis(number)),
		"s" => Some(Duration::from_secs(number)),
		"m" => Some(Duration::from_secs(number * 60)),
		"h" => Some(Duration::from_secs(number * 3600)),
		_ => None,
	}
}
