//! Log subscriber setup for construct
//!
//! Every event the container emits uses the `construct` target. This module
//! installs a `tracing-subscriber` formatter for applications that do not
//! bring their own.
//!
//! # Features
//!
//! - `logging` - Emit container events through `tracing` (default)
//! - `logging-json` - JSON output
//! - `logging-pretty` - Multi-line human readable output
//!
//! Without `logging-json` or `logging-pretty` there is no subscriber to
//! install and [`LoggingBuilder::try_init`] does nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use construct::logging;
//!
//! logging::builder()
//!     .trace()
//!     .pretty()
//!     .construct_only()
//!     .try_init()
//!     .ok();
//! ```
//!
//! `RUST_LOG` takes precedence over the configured level and target unless
//! [`LoggingBuilder::ignore_env`] is called.

use thiserror::Error;
use tracing::Level;

/// Target used by every container event.
pub const TARGET: &str = "construct";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line output with colours
    Pretty,
    /// Single-line output
    Compact,
}

/// A global subscriber could not be installed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to install log subscriber: {0}")]
pub struct InitError(String);

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    from_env: bool,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
    with_thread_names: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::default(),
            target: None,
            from_env: true,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
            with_thread_names: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Individual resolutions and transient constructions
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    /// Registrations, builds and singleton construction
    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    /// Cycles and rolled-back builds only
    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show container events
    pub fn construct_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Do not let `RUST_LOG` override the configured filter
    pub fn ignore_env(mut self) -> Self {
        self.from_env = false;
        self
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directive built from the level and target, e.g. `construct=trace`.
    pub fn directive(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        match self.target {
            Some(target) => format!("{target}={level}"),
            None => level,
        }
    }

    /// Install the subscriber as the global default.
    ///
    /// Fails if a global subscriber is already set. `LogFormat::Json` falls
    /// back to the plain formatter when `logging-json` is not enabled.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), InitError> {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = if self.from_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
        } else {
            EnvFilter::new(self.directive())
        };

        macro_rules! install {
            ($layer:expr) => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        $layer
                            .with_file(self.with_file)
                            .with_line_number(self.with_line_number)
                            .with_thread_ids(self.with_thread_ids)
                            .with_thread_names(self.with_thread_names)
                            .with_target(true),
                    )
                    .try_init()
                    .map_err(|err| InitError(err.to_string()))
            };
        }

        match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => install!(fmt::layer().json()),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => install!(fmt::layer()),
            LogFormat::Pretty => install!(fmt::layer().pretty()),
            LogFormat::Compact => install!(fmt::layer().compact()),
        }
    }

    /// No subscriber is available without `logging-json` or `logging-pretty`.
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn try_init(self) -> Result<(), InitError> {
        Ok(())
    }
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install a subscriber with default settings.
///
/// Pretty output when `logging-pretty` is enabled without `logging-json`,
/// JSON otherwise.
pub fn try_init() -> Result<(), InitError> {
    let builder = builder();

    #[cfg(all(feature = "logging-pretty", not(feature = "logging-json")))]
    let builder = builder.pretty();

    builder.try_init()
}
