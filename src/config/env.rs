// src/config/env.rs

//! Environment overrides for [`EngineConfig`].
//!
//! | Variable | Effect |
//! |---|---|
//! | `OPTUNE_IO_TIMEOUT` | idle timeout in seconds, minus one; empty/`0`/`1` = infinite |
//! | `OPTUNE_VERBOSE_STDERR` | `all`, `minimal`, anything else = none |
//! | `OPTUNE_VERBOSE` | `1`/`true`/`yes`/`on` enables verbose diagnostics |

use std::time::Duration;

use crate::config::model::EngineConfig;
use crate::errors::{DriverTrackError, Result};
use crate::types::StderrMode;

pub const ENV_IO_TIMEOUT: &str = "OPTUNE_IO_TIMEOUT";
pub const ENV_VERBOSE_STDERR: &str = "OPTUNE_VERBOSE_STDERR";
pub const ENV_VERBOSE: &str = "OPTUNE_VERBOSE";

impl EngineConfig {
    /// Overlay environment settings using `lookup` to read variables.
    ///
    /// Unset variables leave the current value alone.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_IO_TIMEOUT) {
            self.io_timeout = parse_io_timeout(&raw)?;
        }
        if let Some(raw) = lookup(ENV_VERBOSE_STDERR) {
            self.stderr_mode = StderrMode::from(raw);
        }
        if let Some(raw) = lookup(ENV_VERBOSE) {
            self.verbose = parse_flag(&raw);
        }
        Ok(())
    }
}

/// The host times out one second before the configured value so that it
/// gives up on a silent driver before whoever supervises the host does.
fn parse_io_timeout(raw: &str) -> Result<Option<Duration>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let secs: u64 = raw.parse().map_err(|e| {
        DriverTrackError::ConfigError(format!(
            "{ENV_IO_TIMEOUT}={raw:?} is not a number of seconds: {e}"
        ))
    })?;

    Ok(match secs.saturating_sub(1) {
        0 => None,
        n => Some(Duration::from_secs(n)),
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
