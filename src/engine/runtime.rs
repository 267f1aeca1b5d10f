// src/engine/runtime.rs

use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::control::{ControlHandle, DriverControl};
use crate::errors::Result;
use crate::exec::{Launch, MultiplexOutcome, launch, multiplex, synthesize_result};
use crate::protocol::ProgressObject;

use super::Invocation;

/// Runs driver invocations against one shared control state.
#[derive(Debug, Clone)]
pub struct DriverEngine {
    control: Arc<DriverControl>,
    config: EngineConfig,
}

impl DriverEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_control(config, DriverControl::new())
    }

    /// Build an engine around an existing control state, e.g. to let
    /// several engines with different settings share one stop switch.
    pub fn with_control(config: EngineConfig, control: Arc<DriverControl>) -> Self {
        Self { control, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn control(&self) -> &Arc<DriverControl> {
        &self.control
    }

    /// Handle for requesting termination/cancellation from other threads.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle::new(Arc::clone(&self.control))
    }

    /// Run one driver to completion.
    ///
    /// Every non-empty progress object the driver prints is passed to
    /// `on_progress` in order. Returning `ControlFlow::Break(())` asks the
    /// engine to stop the driver; it is sent `SIGTERM`, killed if still
    /// running after the exit grace period, and the call still returns the
    /// last object seen (as a failure if the driver then exits non-zero).
    ///
    /// Errors are limited to a driver that cannot be spawned or that
    /// breaks the stdout protocol. Everything else, including an early
    /// stop request, produces a result object.
    pub async fn run<F>(
        &self,
        invocation: &Invocation,
        mut on_progress: F,
    ) -> Result<ProgressObject>
    where
        F: FnMut(&ProgressObject) -> ControlFlow<()>,
    {
        let payload = invocation.payload()?;
        let program = invocation.program_name();

        let (child, registration) = match launch(&self.control, invocation, self.config.verbose)? {
            Launch::Spawned(child, registration) => (child, registration),
            Launch::Rejected(result) => return Ok(result),
        };

        let outcome = multiplex(
            child,
            registration,
            &program,
            &payload,
            &self.config,
            &mut on_progress,
        )
        .await?;

        Ok(self.finish(&program, outcome))
    }

    /// Blocking variant of [`run`](Self::run) for callers outside any async
    /// runtime; drives the invocation on a private current-thread runtime.
    ///
    /// Must not be called from within a Tokio runtime.
    pub fn run_blocking<F>(&self, invocation: &Invocation, on_progress: F) -> Result<ProgressObject>
    where
        F: FnMut(&ProgressObject) -> ControlFlow<()>,
    {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(self.run(invocation, on_progress))
    }

    fn finish(&self, program: &str, outcome: MultiplexOutcome) -> ProgressObject {
        let MultiplexOutcome {
            exit_code,
            candidate,
            stderr,
            delivered,
            aborted,
        } = outcome;

        debug!(program, exit_code, delivered, aborted, "driver exited");

        if exit_code != 0 {
            warn!(program, exit_code, stderr = %stderr.text(), "driver failed");
        } else if self.config.verbose {
            info!(program, stderr = %stderr.text(), "driver stderr");
        }

        let result = synthesize_result(exit_code, candidate, &stderr, self.config.stderr_mode);

        if self.config.verbose {
            info!(program, response = %result, "driver response");
        }

        result
    }
}
