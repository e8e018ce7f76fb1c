//! Avro encoding round-trips for the exported message shapes.

use std::time::Duration;

use alloy::primitives::{Address, I256, U256};
use apache_avro::types::Value;
use apache_avro::{from_avro_datum, to_avro_datum, Schema};
use proptest::prelude::*;

use feed_telemetry::models::{ChainConfig, Envelope, FeedConfig};
use feed_telemetry::services::kafka::{make_transmission_mapping, TRANSMISSION_SCHEMA};

fn chain() -> ChainConfig {
	ChainConfig {
		rpc_endpoint: "http://localhost:8545".to_string(),
		network_name: "mainnet".to_string(),
		network_id: "ethereum-mainnet".to_string(),
		chain_id: "1".to_string(),
		read_timeout: Duration::from_secs(2),
		poll_interval: Duration::from_secs(5),
	}
}

fn feed() -> FeedConfig {
	let contract_address_bytes = Address::repeat_byte(0x11);
	FeedConfig {
		id: "eth-usd".to_string(),
		name: "ETH / USD".to_string(),
		path: "eth-usd".to_string(),
		symbol: "$".to_string(),
		heartbeat: Duration::from_secs(600),
		contract_type: "ocr2".to_string(),
		status: "live".to_string(),
		contract_address: format!("{contract_address_bytes:#x}"),
		contract_address_bytes,
		multiply: U256::from(100_000_000u64),
	}
}

fn field<'a>(fields: &'a [(String, Value)], name: &str) -> &'a Value {
	&fields
		.iter()
		.find(|(n, _)| n == name)
		.unwrap_or_else(|| panic!("missing field {name}"))
		.1
}

proptest! {
	// The numeric fields must survive encoding bit for bit, including
	// negative answers and values beyond f64 precision.
	#[test]
	fn transmission_numeric_fields_round_trip(
		answer in any::<i64>(),
		block_number in any::<u64>(),
		timestamp in 0u64..=i64::MAX as u64,
	) {
		let schema = Schema::parse_str(TRANSMISSION_SCHEMA).unwrap();
		let envelope = Envelope {
			latest_answer: I256::try_from(answer).unwrap(),
			latest_timestamp: timestamp,
			block_number,
			..Envelope::default()
		};

		let value = make_transmission_mapping(&envelope, &chain(), &feed());
		let datum = to_avro_datum(&schema, value).unwrap();
		let decoded = from_avro_datum(&schema, &mut datum.as_slice(), None).unwrap();

		let Value::Record(fields) = decoded else {
			panic!("expected record");
		};
		prop_assert_eq!(
			field(&fields, "block_number"),
			&Value::Bytes(block_number.to_be_bytes().to_vec())
		);

		let Value::Record(answer_fields) = field(&fields, "answer") else {
			panic!("expected answer record");
		};
		prop_assert_eq!(
			field(answer_fields, "data"),
			&Value::Bytes(envelope.latest_answer.to_be_bytes::<32>().to_vec())
		);
		prop_assert_eq!(
			field(answer_fields, "timestamp"),
			&Value::Long(timestamp as i64)
		);
	}
}
