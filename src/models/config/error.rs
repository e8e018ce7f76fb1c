//! Configuration error types.

use thiserror::Error;

/// Errors raised while reading the process configuration from the
/// environment. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Missing required environment variable {0}")]
	MissingEnv(String),

	#[error("Invalid duration in {var}: {value} (expected e.g. \"500ms\", \"5s\", \"2m\", \"1h\")")]
	InvalidDuration { var: String, value: String },

	#[error("Invalid URL in {var}: {value}: {reason}")]
	InvalidUrl {
		var: String,
		value: String,
		reason: String,
	},

	#[error("Invalid value in {var}: {value}: {reason}")]
	InvalidValue {
		var: String,
		value: String,
		reason: String,
	},
}
