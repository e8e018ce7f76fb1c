//! Avro schemas and mappings for the Kafka exporter.
//!
//! Two message shapes leave the pipeline: one `transmission` record per
//! envelope, and one `config_set_simplified` record describing the oracle
//! set attached to it. Numeric chain values that exceed 64 bits travel as
//! big-endian byte strings so no precision is lost downstream.

use apache_avro::types::Value;
use apache_avro::to_avro_datum;

use super::registry::RegisteredSchema;
use crate::models::{ChainConfig, Envelope, FeedConfig};

pub const TRANSMISSION_SCHEMA: &str = r#"
{
	"type": "record",
	"name": "transmission",
	"namespace": "feed_telemetry",
	"fields": [
		{"name": "block_number", "type": "bytes", "doc": "uint64 big-endian"},
		{"name": "answer", "type": {
			"type": "record",
			"name": "answer",
			"fields": [
				{"name": "config_digest", "type": "bytes"},
				{"name": "epoch", "type": "long"},
				{"name": "round", "type": "int"},
				{"name": "data", "type": "bytes", "doc": "int256 big-endian two's complement"},
				{"name": "timestamp", "type": "long"}
			]
		}},
		{"name": "chain_config", "type": {
			"type": "record",
			"name": "chain_config",
			"fields": [
				{"name": "network_name", "type": "string"},
				{"name": "network_id", "type": "string"},
				{"name": "chain_id", "type": "string"}
			]
		}},
		{"name": "feed_config", "type": {
			"type": "record",
			"name": "feed_config",
			"fields": [
				{"name": "feed_name", "type": "string"},
				{"name": "feed_path", "type": "string"},
				{"name": "symbol", "type": "string"},
				{"name": "contract_type", "type": "string"},
				{"name": "contract_status", "type": "string"},
				{"name": "contract_address", "type": "bytes"}
			]
		}},
		{"name": "transmitter", "type": "bytes"},
		{"name": "link_balance", "type": "bytes", "doc": "uint256 big-endian"},
		{"name": "juels_per_fee_coin", "type": "bytes", "doc": "uint256 big-endian"},
		{"name": "aggregator_round_id", "type": "long"}
	]
}
"#;

pub const CONFIG_SET_SIMPLIFIED_SCHEMA: &str = r#"
{
	"type": "record",
	"name": "config_set_simplified",
	"namespace": "feed_telemetry",
	"fields": [
		{"name": "config_digest", "type": "bytes"},
		{"name": "block_number", "type": "bytes", "doc": "uint64 big-endian"},
		{"name": "signers", "type": "string", "doc": "JSON array of hex strings"},
		{"name": "transmitters", "type": "string", "doc": "JSON array of hex addresses"},
		{"name": "f", "type": "int"},
		{"name": "offchain_config", "type": "bytes"},
		{"name": "contract_address", "type": "bytes"}
	]
}
"#;

fn record(fields: Vec<(&str, Value)>) -> Value {
	Value::Record(
		fields
			.into_iter()
			.map(|(name, value)| (name.to_string(), value))
			.collect(),
	)
}

fn hex_json_array<I, B>(items: I) -> String
where
	I: IntoIterator<Item = B>,
	B: AsRef<[u8]>,
{
	let hexed: Vec<String> = items
		.into_iter()
		.map(|b| format!("0x{}", hex::encode(b)))
		.collect();
	serde_json::to_string(&hexed).unwrap_or_else(|_| "[]".to_string())
}

/// Builds the Avro value for one `transmission` record.
pub fn make_transmission_mapping(
	envelope: &Envelope,
	chain: &ChainConfig,
	feed: &FeedConfig,
) -> Value {
	record(vec![
		(
			"block_number",
			Value::Bytes(envelope.block_number.to_be_bytes().to_vec()),
		),
		(
			"answer",
			record(vec![
				(
					"config_digest",
					Value::Bytes(envelope.config_digest.to_vec()),
				),
				("epoch", Value::Long(envelope.epoch as i64)),
				("round", Value::Int(envelope.round as i32)),
				(
					"data",
					Value::Bytes(envelope.latest_answer.to_be_bytes::<32>().to_vec()),
				),
				("timestamp", Value::Long(envelope.latest_timestamp as i64)),
			]),
		),
		(
			"chain_config",
			record(vec![
				("network_name", Value::String(chain.network_name.clone())),
				("network_id", Value::String(chain.network_id.clone())),
				("chain_id", Value::String(chain.chain_id.clone())),
			]),
		),
		(
			"feed_config",
			record(vec![
				("feed_name", Value::String(feed.name.clone())),
				("feed_path", Value::String(feed.path.clone())),
				("symbol", Value::String(feed.symbol.clone())),
				("contract_type", Value::String(feed.contract_type.clone())),
				("contract_status", Value::String(feed.status.clone())),
				(
					"contract_address",
					Value::Bytes(feed.contract_address_bytes.to_vec()),
				),
			]),
		),
		(
			"transmitter",
			Value::Bytes(envelope.transmitter.to_vec()),
		),
		(
			"link_balance",
			Value::Bytes(envelope.link_balance.to_be_bytes::<32>().to_vec()),
		),
		(
			"juels_per_fee_coin",
			Value::Bytes(envelope.juels_per_fee_coin.to_be_bytes::<32>().to_vec()),
		),
		(
			"aggregator_round_id",
			Value::Long(envelope.aggregator_round_id as i64),
		),
	])
}

/// Builds the Avro value for one `config_set_simplified` record.
pub fn make_config_set_simplified_mapping(envelope: &Envelope, feed: &FeedConfig) -> Value {
	let config = &envelope.contract_config;
	record(vec![
		(
			"config_digest",
			Value::Bytes(envelope.config_digest.to_vec()),
		),
		(
			"block_number",
			Value::Bytes(envelope.block_number.to_be_bytes().to_vec()),
		),
		("signers", Value::String(hex_json_array(&config.signers))),
		(
			"transmitters",
			Value::String(hex_json_array(config.transmitters.iter())),
		),
		("f", Value::Int(config.f as i32)),
		(
			"offchain_config",
			Value::Bytes(config.encoded_offchain_config.clone()),
		),
		(
			"contract_address",
			Value::Bytes(feed.contract_address_bytes.to_vec()),
		),
	])
}

/// Serializes a value in the Confluent wire format: a zero magic byte, the
/// big-endian schema id, then the Avro datum.
pub fn encode_with_framing(
	registered: &RegisteredSchema,
	value: Value,
) -> Result<Vec<u8>, apache_avro::Error> {
	let datum = to_avro_datum(&registered.schema, value)?;
	let mut framed = Vec::with_capacity(5 + datum.len());
	framed.push(0u8);
	framed.extend_from_slice(&registered.id.to_be_bytes());
	framed.extend_from_slice(&datum);
	Ok(framed)
}
