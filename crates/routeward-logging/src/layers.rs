//! Formatting layers and writers
//!
//! Every layer is boxed so the builder can stack any combination of
//! console and file output on one registry.

use std::fs::{self, File};

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::{MakeWriter, TestWriter};
use tracing_subscriber::registry::LookupSpan;

use crate::LoggingError;
use crate::config::{ConsoleConfig, ConsoleFormat, FileConfig, JsonlConfig, RotationStrategy};

/// A type-erased layer over subscriber `S`
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Create a JSONL formatting layer writing to `writer`
pub fn jsonl_layer<S, W>(writer: W, config: &JsonlConfig) -> BoxedLayer<S>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer)
        .boxed()
}

/// Create the console layer described by `console`
pub fn console_layer<S>(console: &ConsoleConfig, jsonl: &JsonlConfig) -> BoxedLayer<S>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    match (console.format, console.capture) {
        (ConsoleFormat::Pretty, true) => tracing_subscriber::fmt::layer()
            .with_ansi(console.ansi)
            .with_test_writer()
            .boxed(),
        (ConsoleFormat::Pretty, false) => tracing_subscriber::fmt::layer()
            .with_ansi(console.ansi)
            .boxed(),
        (ConsoleFormat::Json, true) => jsonl_layer(TestWriter::new(), jsonl),
        (ConsoleFormat::Json, false) => jsonl_layer(std::io::stdout, jsonl),
    }
}

/// Open a non-blocking writer for file output
///
/// [`RotationStrategy::Never`] truncates a single `<prefix>.log`; the
/// rotating strategies append to dated files and prune beyond `retain`.
pub fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory).map_err(|source| LoggingError::Io {
        path: config.directory.clone(),
        source,
    })?;

    let (rotation, retain) = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = File::create(&path).map_err(|source| LoggingError::Io { path, source })?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily { retain } => (Rotation::DAILY, retain),
        RotationStrategy::Hourly { retain } => (Rotation::HOURLY, retain),
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix);
    if let Some(retain) = retain {
        builder = builder.max_log_files(retain);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}
