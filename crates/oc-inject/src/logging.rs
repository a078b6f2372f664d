//! Logging configuration
//!
//! Verbosity is carried explicitly in a [`LogConfig`] rather than in global
//! state. The config decides the `tracing` filter installed by `main` and
//! whether external commands are executed or only logged.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// How much the tool reports about what it does
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Warnings and errors only
    Quiet,
    /// The manifest, skipped dependencies and the chosen plan
    Verbose,
    /// Additionally every external command before it runs
    Trace,
    /// Additionally raw dynamic-linker output
    Debug,
}

impl LogLevel {
    /// Map the number of `-v` flags to a level
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Self::Quiet,
            1 => Self::Verbose,
            2 => Self::Trace,
            _ => Self::Debug,
        }
    }

    /// `tracing` filter directive for this level
    pub fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Verbose => "info",
            Self::Trace => "debug",
            Self::Debug => "trace",
        }
    }
}

/// Logging configuration shared by every component of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Requested verbosity
    pub level: LogLevel,
    /// Log external commands instead of running them
    pub dry_run: bool,
}

impl LogConfig {
    pub fn new(level: LogLevel, dry_run: bool) -> Self {
        Self { level, dry_run }
    }

    /// Level actually used; a dry run is pointless if its commands are hidden
    pub fn effective_level(&self) -> LogLevel {
        if self.dry_run {
            self.level.max(LogLevel::Verbose)
        } else {
            self.level
        }
    }

    /// Filter for the subscriber. `RUST_LOG` wins when set.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.effective_level().directive()))
    }

    /// Install the global subscriber
    pub fn init(&self) {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(self.filter())
            .init();
    }
}
