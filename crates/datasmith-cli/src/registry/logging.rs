use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

use super::{RegistryError, RegistryResult};

const DEFAULT_CONSOLE_FILTER: &str = "warn";

/// Where JSON log lines go: memory until the run directory exists, then
/// `logs.ndjson`.
enum LogSink {
    Buffer(Vec<u8>),
    File(File),
}

/// Handle to the JSON log layer of a generation run.
#[derive(Clone)]
pub struct RunLog {
    sink: Arc<Mutex<LogSink>>,
}

impl RunLog {
    /// Flush buffered lines into `path` and append there from now on.
    pub fn attach(&self, path: &Path) -> RegistryResult<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| RegistryError::Logging("failed to lock log sink".to_string()))?;
        if let LogSink::Buffer(buffered) = &*sink {
            file.write_all(buffered)?;
        }
        *sink = LogSink::File(file);
        Ok(())
    }
}

/// Console logging only, filtered by `RUST_LOG`.
pub fn init_console_logging() -> RegistryResult<()> {
    tracing_subscriber::registry()
        .with(console_layer())
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))
}

/// Console logging plus a JSON layer captured for the run directory.
pub fn init_run_logging() -> RegistryResult<RunLog> {
    let log = RunLog {
        sink: Arc::new(Mutex::new(LogSink::Buffer(Vec::new()))),
    };
    let sink = Arc::clone(&log.sink);
    let make_writer = BoxMakeWriter::new(move || SharedWriter {
        sink: Arc::clone(&sink),
    });

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(make_writer)
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(console_layer())
        .with(json_layer)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))?;

    Ok(log)
}

fn console_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER));
    tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter)
}

struct SharedWriter {
    sink: Arc<Mutex<LogSink>>,
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::other("failed to lock log sink"))?;
        match &mut *sink {
            LogSink::Buffer(buffer) => {
                buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
            LogSink::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::other("failed to lock log sink"))?;
        match &mut *sink {
            LogSink::Buffer(_) => Ok(()),
            LogSink::File(file) => file.flush(),
        }
    }
}
