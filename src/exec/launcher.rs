// src/exec/launcher.rs

//! Spawning a driver under the control-state lock.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::control::{DriverControl, Registration, Rejection};
use crate::engine::Invocation;
use crate::errors::{DriverTrackError, Result};
use crate::protocol::{ProgressObject, STATUS_CANCELED, STATUS_TERMINATED};

/// Result of trying to start a driver.
#[derive(Debug)]
pub enum Launch {
    /// The driver is running and registered.
    Spawned(Child, Registration),
    /// A stop was already requested; this is the invocation's final result.
    Rejected(ProgressObject),
}

/// Spawn the driver described by `invocation` with all three standard
/// streams piped, unless a cancellation or termination was already
/// requested on `control`.
///
/// Must be called from within a Tokio runtime.
pub fn launch(
    control: &Arc<DriverControl>,
    invocation: &Invocation,
    verbose: bool,
) -> Result<Launch> {
    if verbose {
        info!(command = %invocation.command_line(), "driver request");
    }

    let mut cmd = Command::new(invocation.program());
    cmd.args(invocation.arguments())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let outcome = control
        .try_register(|| {
            cmd.spawn().map(|child| {
                let pid = child.id();
                (child, pid)
            })
        })
        .map_err(|source| DriverTrackError::Spawn {
            program: invocation.program_name(),
            source,
        })?;

    match outcome {
        Ok((child, registration)) => {
            debug!(
                program = %invocation.program_name(),
                pid = ?registration.pid(),
                "driver spawned"
            );
            Ok(Launch::Spawned(child, registration))
        }
        Err(rejection) => {
            let status = match rejection {
                Rejection::Canceled => STATUS_CANCELED,
                Rejection::Terminated => STATUS_TERMINATED,
            };
            info!(
                program = %invocation.program_name(),
                status,
                "stop already requested; driver not started"
            );
            Ok(Launch::Rejected(ProgressObject::with_status(status)))
        }
    }
}
