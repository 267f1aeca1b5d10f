#![allow(dead_code)]

use std::time::Duration;

use drivertrack::DriverEngine;
use drivertrack::config::EngineConfig;

pub use drivertrack_test_utils::drivers::{ScriptDriver, echo_driver};
pub use drivertrack_test_utils::recorder::ProgressRecorder;
pub use drivertrack_test_utils::{init_tracing, with_timeout};

/// Engine with a short exit grace period so kill paths finish quickly.
pub fn engine() -> DriverEngine {
    DriverEngine::new(config())
}

pub fn config() -> EngineConfig {
    EngineConfig::default().with_exit_timeout(Duration::from_millis(500))
}
