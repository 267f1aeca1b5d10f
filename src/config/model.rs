// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::StderrMode;

/// Seconds to wait for a driver to exit once both of its output streams
/// have closed, before it is killed.
pub const DEFAULT_EXIT_TIMEOUT_SECS: u64 = 3;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [engine]
/// io_timeout = 30
/// exit_timeout = 3
/// verbose_stderr = "minimal"
/// verbose = false
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Idle timeout in seconds while waiting for driver I/O; `0` waits
    /// indefinitely.
    #[serde(default)]
    pub io_timeout: u64,

    /// Grace period in seconds between a driver closing its streams and
    /// being killed.
    #[serde(default = "default_exit_timeout")]
    pub exit_timeout: u64,

    /// `"all"`, `"minimal"`, or anything else for none.
    #[serde(default)]
    pub verbose_stderr: StderrMode,

    /// Echo command lines, stdout lines and responses to the log.
    #[serde(default)]
    pub verbose: bool,
}

fn default_exit_timeout() -> u64 {
    DEFAULT_EXIT_TIMEOUT_SECS
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            io_timeout: 0,
            exit_timeout: default_exit_timeout(),
            verbose_stderr: StderrMode::default(),
            verbose: false,
        }
    }
}

/// Validated engine settings used at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// `None` waits for driver I/O forever.
    pub io_timeout: Option<Duration>,
    pub exit_timeout: Duration,
    pub stderr_mode: StderrMode,
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            io_timeout: None,
            exit_timeout: Duration::from_secs(DEFAULT_EXIT_TIMEOUT_SECS),
            stderr_mode: StderrMode::All,
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_exit_timeout(mut self, timeout: Duration) -> Self {
        self.exit_timeout = timeout;
        self
    }

    pub fn with_stderr_mode(mut self, mode: StderrMode) -> Self {
        self.stderr_mode = mode;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
