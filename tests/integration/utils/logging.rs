//! Logging setup with a captured writer.

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use feed_telemetry::utils::logging::setup_logging_with_writer;

#[derive(Clone)]
struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for BufferWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.0.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl<'a> MakeWriter<'a> for BufferWriter {
	type Writer = BufferWriter;

	fn make_writer(&'a self) -> Self::Writer {
		self.clone()
	}
}

#[test]
fn captured_writer_receives_formatted_events() {
	let buffer = Arc::new(Mutex::new(Vec::new()));
	setup_logging_with_writer(BufferWriter(buffer.clone())).unwrap();

	tracing::info!("telemetry logging online");

	let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
	assert!(output.contains("telemetry logging online"));
	assert!(output.contains("INFO"));
}
