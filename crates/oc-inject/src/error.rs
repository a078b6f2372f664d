//! Error types for oc-inject

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for oc-inject operations
pub type Result<T> = std::result::Result<T, Error>;

/// Exit status used when a command could not be started at all
pub const SPAWN_FAILURE_STATUS: u8 = 127;

/// Main error type for oc-inject
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[help]
        help: String,
    },

    /// The executable or its dependency closure could not be discovered
    #[error("Discovery error: {message}")]
    Discovery {
        message: String,
        #[help]
        help: String,
    },

    /// No deployment plan can satisfy the request
    #[error("Plan error: {message}")]
    Plan {
        message: String,
        #[help]
        help: String,
    },

    /// Local staging failed
    #[error("Transfer error: {message}")]
    Transfer {
        message: String,
        #[help]
        help: String,
    },

    /// An external command ran and reported failure
    #[error("`{command}` failed with exit status {code}")]
    CommandFailed {
        /// Shell-quoted rendering of the command
        command: String,
        /// Exit status reported by the command
        code: i32,
        #[help]
        help: Option<String>,
    },

    /// An external command could not be started
    #[error("Failed to start `{command}`: {source}")]
    #[diagnostic(help("Check that the command is installed and on PATH"))]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a discovery error
    pub fn discovery(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a plan error
    pub fn plan(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Plan {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a transfer error
    pub fn transfer(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Transfer {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a failed-command error
    pub fn command_failed(command: impl Into<String>, code: i32, help: Option<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code,
            help,
        }
    }

    /// Exit status the tool reports for this error.
    ///
    /// A failed external command propagates its own status; anything that
    /// stops the pipeline before a command runs reports 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CommandFailed { code, .. } => status_byte(*code),
            Self::Spawn { .. } => SPAWN_FAILURE_STATUS,
            _ => 1,
        }
    }
}

/// Clamp a process status into the range a process can exit with.
///
/// Zero is never returned for a failure, so a failure is never mistaken
/// for success.
pub fn status_byte(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(0) | Err(_) => 1,
        Ok(code) => code,
    }
}
