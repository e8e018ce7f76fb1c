//! Kafka publishing stack: producer, schema registry client, and the Avro
//! schemas the exporter encodes with.

mod producer;
mod registry;
mod schemas;

pub use producer::{KafkaProducer, MessageProducer, ProducerError};
pub use registry::{
	value_subject, HttpSchemaRegistry, RegisteredSchema, RegistryError, SchemaRegistry,
};
pub use schemas::{
	encode_with_framing, make_config_set_simplified_mapping, make_transmission_mapping,
	CONFIG_SET_SIMPLIFIED_SCHEMA, TRANSMISSION_SCHEMA,
};
