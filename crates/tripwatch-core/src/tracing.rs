//! Logging for the `tripwatch` binary and the libraries under it.
//!
//! Every crate logs through `tracing`; this module picks the subscriber.
//! One-shot commands get terse stderr output that stays quiet unless
//! something goes wrong, and `tripwatch run --json-logs` gets JSON lines in
//! which each upstream poll and calendar sync closes with its own timing
//! record.
//!
//! ```ignore
//! use tripwatch_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli(verbose))?;
//! init_tracing(TracingConfig::daemon())?;
//! ```
//!
//! `RUST_LOG` overrides the preset level, and an explicit
//! [`TracingConfig::with_env_filter`] overrides both.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Target prefix shared by every crate in the workspace.
pub const LOG_TARGET: &str = "tripwatch";

/// Why the subscriber could not be installed.
#[derive(Debug, Error)]
pub enum TracingError {
    /// Another subscriber was installed first, usually by a test harness.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The explicit filter directive is not valid `EnvFilter` syntax.
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How each log record is laid out on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line records, for reading a poller in a terminal.
    #[default]
    Pretty,
    /// Single line per event, used by one-shot CLI commands.
    Compact,
    /// One JSON object per line, used by the daemon.
    Json,
}

/// Configuration for [`init_tracing`].
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for `tripwatch*` targets when `RUST_LOG` is not set.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Adds file and line to every record.
    pub source_location: bool,
    /// Adds the module path to every record.
    pub show_target: bool,
    pub timestamps: bool,
    /// Emits a record when a poll or sync span closes, carrying how long it
    /// was busy and idle.
    pub poll_timing: bool,
    /// Explicit filter directive, takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            source_location: false,
            show_target: true,
            timestamps: true,
            poll_timing: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Compact, timestamp-free output for interactive commands.
    ///
    /// Warnings only by default, since command output goes to stdout.
    /// `verbose` raises the level to DEBUG and adds source locations.
    #[must_use]
    pub fn cli(verbose: bool) -> Self {
        Self {
            default_level: if verbose { Level::DEBUG } else { Level::WARN },
            output_format: TracingOutputFormat::Compact,
            source_location: verbose,
            show_target: verbose,
            timestamps: false,
            poll_timing: false,
            env_filter: None,
        }
    }

    /// JSON lines with poll timings for the long-running poller.
    #[must_use]
    pub fn daemon() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            source_location: true,
            poll_timing: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Uses `filter` instead of `RUST_LOG` and the preset level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The directive used when neither `env_filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("{LOG_TARGET}={}", self.default_level)
    }

    /// Span lifecycle records to emit. Only closing carries the timings.
    pub fn span_events(&self) -> FmtSpan {
        if self.poll_timing {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.env_filter {
            Some(filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_target(self.show_target)
            .with_span_events(self.span_events());
        match (self.output_format, self.timestamps) {
            (TracingOutputFormat::Json, _) => base.json().boxed(),
            (TracingOutputFormat::Pretty, true) => base.pretty().boxed(),
            (TracingOutputFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (TracingOutputFormat::Compact, true) => base.compact().boxed(),
            (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        }
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the explicit
/// filter directive does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;
    let subscriber = tracing_subscriber::registry()
        .with(config.layer())
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::INFO);
        assert_eq!(config.output_format, TracingOutputFormat::Pretty);
        assert_eq!(config.default_directive(), "tripwatch=INFO");
        assert_eq!(config.span_events(), FmtSpan::NONE);
    }

    #[test]
    fn cli_config() {
        let quiet = TracingConfig::cli(false);
        assert_eq!(quiet.default_level, Level::WARN);
        assert_eq!(quiet.output_format, TracingOutputFormat::Compact);
        assert!(!quiet.timestamps);
        assert!(!quiet.source_location);

        let verbose = TracingConfig::cli(true);
        assert_eq!(verbose.default_level, Level::DEBUG);
        assert!(verbose.source_location);
    }

    #[test]
    fn daemon_times_each_poll() {
        let config = TracingConfig::daemon();
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.default_level, Level::INFO);
        assert!(config.timestamps);
        assert_eq!(config.span_events(), FmtSpan::CLOSE);
    }

    #[test]
    fn explicit_filter_wins() {
        let config = TracingConfig::default()
            .with_level(Level::TRACE)
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("tripwatch_server=debug");

        assert_eq!(config.default_level, Level::TRACE);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.env_filter.as_deref(), Some("tripwatch_server=debug"));
        assert!(config.filter().is_ok());

        let broken = TracingConfig::default().with_env_filter("tripwatch=[");
        assert!(matches!(broken.filter(), Err(TracingError::EnvFilter(_))));
    }
}
