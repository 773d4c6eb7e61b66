//! Structured logging for Routeward
//!
//! Wires `tracing-subscriber` up for the reconciler's structured events:
//! every lifecycle operation runs in a span carrying `route_table_id` and
//! `destination`, so each JSONL line can be traced back to the route it
//! concerns.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines for log aggregation (default)
//! - **Pretty Output**: Human-readable console output for development
//! - **File Rotation**: Daily/hourly rotation with retention via tracing-appender
//! - **Test Capture**: Output routed through the test harness
//!
//! # Quick Start
//!
//! ```ignore
//! use routeward_logging::{LogConfig, RouteSubscriberBuilder};
//!
//! // JSONL to console
//! RouteSubscriberBuilder::new().init();
//!
//! // Pretty output with reconciler debug events
//! RouteSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .with_directive("routeward_reconcile=trace")
//!     .init();
//!
//! // Keep the guard alive so buffered file output is flushed
//! let _guard = RouteSubscriberBuilder::new()
//!     .with_config(LogConfig::production("/var/log/routeward".into()))
//!     .try_init()?;
//! ```

pub mod config;
pub mod layers;

pub use config::{ConsoleConfig, ConsoleFormat, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use layers::BoxedLayer;
pub use tracing_appender::non_blocking::WorkerGuard;

use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors initializing logging
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("a global tracing subscriber is already set: {0}")]
    AlreadyInitialized(#[from] TryInitError),

    #[error("invalid filter directive {directive:?}: {source}")]
    InvalidDirective {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("error preparing log output at \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error creating rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),
}

/// Builder for configuring and initializing the logging subscriber
///
/// By default, console output uses JSONL format. Use
/// [`LogConfig::development()`] for human-readable output.
pub struct RouteSubscriberBuilder {
    config: LogConfig,
}

impl RouteSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Add a filter directive, e.g. `routeward_reconcile=debug`
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.config.directives.push(directive.into());
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Build the level filter
    ///
    /// `RUST_LOG` replaces the default level when set; configured
    /// directives are added on top either way.
    pub fn build_filter(&self) -> Result<EnvFilter, LoggingError> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        for directive in &self.config.directives {
            let parsed: Directive =
                directive
                    .parse()
                    .map_err(|source| LoggingError::InvalidDirective {
                        directive: directive.clone(),
                        source,
                    })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    /// Try to initialize the subscriber globally
    ///
    /// Returns the file writer's guard when file output is configured; it
    /// must be kept alive for buffered lines to be flushed.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let filter = self.build_filter()?;

        let mut stack: Vec<BoxedLayer<Registry>> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            stack.push(layers::console_layer(
                &self.config.console,
                &self.config.jsonl,
            ));
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = layers::file_writer(file_config)?;
            stack.push(layers::jsonl_layer(writer, &self.config.jsonl));
            guard = Some(file_guard);
        }

        Registry::default().with(stack).with(filter).try_init()?;
        Ok(guard)
    }

    /// Initialize the subscriber globally, reporting failures on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }
}

impl Default for RouteSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() {
    RouteSubscriberBuilder::new().init();
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() {
    RouteSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize logging for tests
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
pub fn init_testing() {
    let _ = RouteSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
