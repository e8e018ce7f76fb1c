//! Schema registry negotiation.

use feed_telemetry::services::kafka::{value_subject, HttpSchemaRegistry, SchemaRegistry};
use feed_telemetry::utils::{create_retryable_http_client, HttpRetryConfig};

fn registry_for(server: &mockito::Server) -> HttpSchemaRegistry {
	let client = create_retryable_http_client(
		&HttpRetryConfig {
			max_retries: 0,
			..Default::default()
		},
		reqwest::Client::new(),
	);
	HttpSchemaRegistry::new(client, server.url().parse().unwrap(), None, None)
}

const SCHEMA: &str = r#"{"type": "record", "name": "t", "fields": [{"name": "a", "type": "long"}]}"#;

#[tokio::test]
async fn reuses_structurally_equal_schema() {
	let mut server = mockito::Server::new_async().await;
	// Same schema, different formatting and key order: still a match.
	let registered_body = serde_json::json!({
		"id": 42,
		"schema": r#"{"name":"t","type":"record","fields":[{"type":"long","name":"a"}]}"#
	});
	let _latest = server
		.mock("GET", "/subjects/transmission-value/versions/latest")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(registered_body.to_string())
		.create_async()
		.await;
	// No POST mock: a registration attempt would fail the test with a 501.

	let registry = registry_for(&server);
	let registered = registry
		.ensure_schema(&value_subject("transmission"), SCHEMA)
		.await
		.unwrap();

	assert_eq!(registered.id, 42);
	assert_eq!(registered.subject, "transmission-value");
}

#[tokio::test]
async fn registers_when_latest_differs() {
	let mut server = mockito::Server::new_async().await;
	let registered_body = serde_json::json!({
		"id": 42,
		"schema": r#"{"type":"record","name":"t","fields":[{"name":"b","type":"long"}]}"#
	});
	let _latest = server
		.mock("GET", "/subjects/transmission-value/versions/latest")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(registered_body.to_string())
		.create_async()
		.await;
	let register = server
		.mock("POST", "/subjects/transmission-value/versions")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"id": 43}"#)
		.expect(1)
		.create_async()
		.await;

	let registry = registry_for(&server);
	let registered = registry
		.ensure_schema(&value_subject("transmission"), SCHEMA)
		.await
		.unwrap();

	assert_eq!(registered.id, 43);
	register.assert_async().await;
}

#[tokio::test]
async fn registers_when_subject_is_new() {
	let mut server = mockito::Server::new_async().await;
	let _latest = server
		.mock("GET", "/subjects/transmission-value/versions/latest")
		.with_status(404)
		.create_async()
		.await;
	let register = server
		.mock("POST", "/subjects/transmission-value/versions")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"id": 1}"#)
		.expect(1)
		.create_async()
		.await;

	let registry = registry_for(&server);
	let registered = registry
		.ensure_schema(&value_subject("transmission"), SCHEMA)
		.await
		.unwrap();

	assert_eq!(registered.id, 1);
	register.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_fatal() {
	let mut server = mockito::Server::new_async().await;
	let _latest = server
		.mock("GET", "/subjects/transmission-value/versions/latest")
		.with_status(500)
		.create_async()
		.await;

	let registry = registry_for(&server);
	assert!(registry
		.ensure_schema(&value_subject("transmission"), SCHEMA)
		.await
		.is_err());
}
