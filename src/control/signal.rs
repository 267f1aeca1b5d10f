// src/control/signal.rs

//! Delivering stop requests to driver processes by pid.

use tracing::{debug, warn};

/// Requests the host can make of a running driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSignal {
    /// Graceful stop (`SIGTERM`).
    Terminate,
    /// Driver-interpretable abort (`SIGUSR1`); the driver may answer with
    /// its own final status before exiting.
    Cancel,
}

#[cfg(unix)]
impl DriverSignal {
    fn as_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal;
        match self {
            DriverSignal::Terminate => Signal::SIGTERM,
            DriverSignal::Cancel => Signal::SIGUSR1,
        }
    }
}

/// Send `sig` to `pid`, best effort.
///
/// A process that is already gone is not an error.
#[cfg(unix)]
pub fn send_signal(pid: u32, sig: DriverSignal) {
    use nix::sys::signal;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid, "pid out of range; not signalling");
        return;
    };

    match signal::kill(Pid::from_raw(raw), sig.as_nix()) {
        Ok(()) => debug!(pid, signal = ?sig, "signalled driver"),
        Err(nix::errno::Errno::ESRCH) => {
            debug!(pid, signal = ?sig, "driver already exited; signal not delivered")
        }
        Err(e) => warn!(pid, signal = ?sig, error = %e, "failed to signal driver"),
    }
}

#[cfg(not(unix))]
pub fn send_signal(pid: u32, sig: DriverSignal) {
    warn!(pid, signal = ?sig, "signal delivery is not supported on this platform");
}
