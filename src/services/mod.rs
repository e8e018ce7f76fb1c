//! Runtime services: data sources, pollers, exporters, the Kafka stack and
//! the monitor assembly that ties them together.

pub mod exporter;
pub mod kafka;
pub mod monitor;
pub mod poller;
pub mod source;
