// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only the "hard" failures of an invocation are errors: a driver that could
//! not be spawned, or one that broke the stdout protocol. Everything else a
//! driver can do (exit non-zero, hang, get cancelled) is folded into the
//! returned [`ProgressObject`](crate::protocol::ProgressObject).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverTrackError {
    #[error("failed to spawn driver '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("driver '{program}' violated the output protocol on line {line:?}: {reason}")]
    Protocol {
        program: String,
        line: String,
        reason: String,
    },

    #[error("failed to read stdout of driver '{program}': {source}")]
    StdoutRead {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DriverTrackError {
    /// True for the errors that abandon a running driver mid-stream.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            DriverTrackError::Protocol { .. } | DriverTrackError::StdoutRead { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DriverTrackError>;
