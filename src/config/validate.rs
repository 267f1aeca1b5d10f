// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{EngineConfig, RawConfigFile};
use crate::errors::{DriverTrackError, Result};

impl TryFrom<RawConfigFile> for EngineConfig {
    type Error = DriverTrackError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let engine = raw.engine;
        Ok(EngineConfig {
            io_timeout: (engine.io_timeout > 0).then(|| Duration::from_secs(engine.io_timeout)),
            exit_timeout: Duration::from_secs(engine.exit_timeout),
            stderr_mode: engine.verbose_stderr,
            verbose: engine.verbose,
        })
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.engine.exit_timeout == 0 {
        return Err(DriverTrackError::ConfigError(
            "[engine].exit_timeout must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
