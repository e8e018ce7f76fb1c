//! Feed telemetry service entry point.
//!
//! Reads the process configuration from the environment, builds the
//! monitoring pipeline, starts the HTTP server for `/metrics` and `/debug`,
//! and shuts everything down in order on Ctrl+C: monitors drain first, then
//! the HTTP server stops.

use std::env::set_var;
use std::sync::Arc;

use anyhow::Context;
use clap::{Arg, Command};
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{error, info};

use feed_telemetry::bootstrap::initialize_pipeline;
use feed_telemetry::models::Config;
use feed_telemetry::utils::logging::setup_logging;
use feed_telemetry::utils::metrics::server::create_http_server;
use feed_telemetry::utils::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv().ok();

	let matches = Command::new("feed-telemetry")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Exports on-chain price feed telemetry to Prometheus and Kafka")
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.value_name("LEVEL")
				.help("Sets the log filter (overrides RUST_LOG)"),
		)
		.arg(
			Arg::new("http-address")
				.long("http-address")
				.value_name("ADDR")
				.help("Bind address for /metrics and /debug (overrides HTTP_ADDRESS)"),
		)
		.get_matches();

	if let Some(level) = matches.get_one::<String>("log-level") {
		set_var("RUST_LOG", level);
	}
	if let Some(address) = matches.get_one::<String>("http-address") {
		set_var("HTTP_ADDRESS", address);
	}

	if let Err(e) = setup_logging() {
		eprintln!("Failed to set up logging: {}", e);
	}

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Configuration error: {}", e);
			return Err(e.into());
		}
	};

	let metrics = Arc::new(Metrics::new().context("failed to build the metrics registry")?);
	let pipeline = initialize_pipeline(&config, metrics.clone()).await?;

	let server = create_http_server(
		config.http_address.clone(),
		metrics,
		pipeline.shared_feeds.clone(),
	)
	.context("failed to bind the HTTP server")?;
	let server_handle = server.handle();
	let http_task = tokio::spawn(server);

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let pipeline_task = tokio::spawn(pipeline.run(shutdown_rx));

	tokio::signal::ctrl_c()
		.await
		.context("failed to listen for the shutdown signal")?;
	info!("Shutdown signal received, stopping monitors");

	let _ = shutdown_tx.send(true);
	if let Err(e) = pipeline_task.await {
		error!("Pipeline task failed: {}", e);
	}

	server_handle.stop(true).await;
	if let Err(e) = http_task.await {
		error!("HTTP server task failed: {}", e);
	}

	info!("Shutdown complete");
	Ok(())
}
