// src/control/mod.rs

//! Shared cancellation/termination state and the live-driver registry.
//!
//! One [`DriverControl`] is shared by every invocation an engine runs. A
//! single mutex guards the two sticky flags and the registry together, so a
//! request that believes itself complete can never race a driver being
//! spawned behind its back:
//!
//! - spawning checks the flags and registers the new child in one critical
//!   section ([`DriverControl::try_register`]);
//! - a request sets its flag and snapshots the registry in one critical
//!   section, then signals outside the lock;
//! - a [`Registration`] removes its child when dropped, which the engine does
//!   only after the child has been reaped or abandoned.
//!
//! Besides signalling, every request wakes the running invocations through a
//! `watch` channel so each one can start its exit-grace countdown.

pub mod signal;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

pub use signal::{DriverSignal, send_signal};

/// Opaque identity of one registered driver process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildId(u64);

/// Why a spawn was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Canceled,
    Terminated,
}

#[derive(Debug, Default)]
struct ControlState {
    terminate: bool,
    cancel: bool,
    next_id: u64,
    children: HashMap<ChildId, u32>,
}

#[derive(Debug)]
pub struct DriverControl {
    state: Mutex<ControlState>,
    stop_tx: watch::Sender<bool>,
}

impl Default for DriverControl {
    fn default() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            state: Mutex::new(ControlState::default()),
            stop_tx,
        }
    }
}

impl DriverControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        // Nothing inside the lock can leave the state half-updated, so a
        // poisoned mutex is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check the flags and, if neither is set, run `spawn` and register the
    /// pid it reports, all under the lock.
    ///
    /// `spawn` returns the spawned value together with its pid (`None` when
    /// the process already exited and was reaped, in which case there is
    /// nothing to signal).
    pub fn try_register<T, E>(
        self: &Arc<Self>,
        spawn: impl FnOnce() -> std::result::Result<(T, Option<u32>), E>,
    ) -> std::result::Result<std::result::Result<(T, Registration), Rejection>, E> {
        let mut state = self.lock();
        if state.cancel {
            return Ok(Err(Rejection::Canceled));
        }
        if state.terminate {
            return Ok(Err(Rejection::Terminated));
        }

        let (spawned, pid) = spawn()?;

        state.next_id += 1;
        let id = ChildId(state.next_id);
        if let Some(pid) = pid {
            state.children.insert(id, pid);
        }
        debug!(?id, ?pid, "registered driver");

        Ok(Ok((
            spawned,
            Registration {
                control: Arc::clone(self),
                id,
                pid,
                stop_rx: self.stop_tx.subscribe(),
            },
        )))
    }

    /// Set the terminate flag and send `SIGTERM` to every live driver.
    pub fn request_termination(&self) {
        self.snapshot_and_signal(DriverSignal::Terminate);
    }

    /// Set the cancel flag and send `SIGUSR1` to every live driver.
    pub fn request_cancellation(&self) {
        self.snapshot_and_signal(DriverSignal::Cancel);
    }

    fn snapshot_and_signal(&self, sig: DriverSignal) {
        let pids: Vec<u32> = {
            let mut state = self.lock();
            match sig {
                DriverSignal::Terminate => state.terminate = true,
                DriverSignal::Cancel => state.cancel = true,
            }
            self.stop_tx.send_replace(true);
            state.children.values().copied().collect()
        };

        // The registry can only shrink from here on, so the snapshot covers
        // every driver that will ever need this signal.
        info!(signal = ?sig, drivers = pids.len(), "stop requested for all drivers");
        for pid in pids {
            send_signal(pid, sig);
        }
    }

    fn deregister(&self, id: ChildId) {
        let mut state = self.lock();
        state.children.remove(&id);
        debug!(?id, "deregistered driver");
    }

    pub fn is_terminating(&self) -> bool {
        self.lock().terminate
    }

    pub fn is_canceled(&self) -> bool {
        self.lock().cancel
    }

    /// Number of drivers currently registered.
    pub fn active_children(&self) -> usize {
        self.lock().children.len()
    }
}

/// Cloneable handle for issuing stop requests from other threads.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    control: Arc<DriverControl>,
}

impl ControlHandle {
    pub fn new(control: Arc<DriverControl>) -> Self {
        Self { control }
    }

    pub fn request_termination(&self) {
        self.control.request_termination();
    }

    pub fn request_cancellation(&self) {
        self.control.request_cancellation();
    }

    pub fn is_terminating(&self) -> bool {
        self.control.is_terminating()
    }

    pub fn is_canceled(&self) -> bool {
        self.control.is_canceled()
    }

    pub fn active_children(&self) -> usize {
        self.control.active_children()
    }
}

/// Registry entry for one driver; deregisters on drop.
#[derive(Debug)]
pub struct Registration {
    control: Arc<DriverControl>,
    id: ChildId,
    pid: Option<u32>,
    stop_rx: watch::Receiver<bool>,
}

impl Registration {
    pub fn id(&self) -> ChildId {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Signal just this driver.
    pub fn signal(&self, sig: DriverSignal) {
        if let Some(pid) = self.pid {
            send_signal(pid, sig);
        }
    }

    /// Resolves once termination or cancellation has been requested for
    /// every driver. Cancellation safe.
    pub async fn stop_requested(&mut self) {
        // The sender lives in `control`, which this registration keeps alive.
        let _ = self.stop_rx.wait_for(|stopped| *stopped).await;
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.control.deregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_spawn(pid: Option<u32>) -> impl FnOnce() -> Result<((), Option<u32>), ()> {
        move || Ok(((), pid))
    }

    #[test]
    fn registers_and_deregisters_on_drop() {
        let control = DriverControl::new();
        let (_, reg) = control.try_register(fake_spawn(None)).unwrap().unwrap();
        assert_eq!(control.active_children(), 0);
        drop(reg);

        // Pids that cannot belong to a live process; nothing is signalled.
        let (_, a) = control.try_register(fake_spawn(Some(u32::MAX))).unwrap().unwrap();
        let (_, b) = control.try_register(fake_spawn(Some(u32::MAX - 1))).unwrap().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(control.active_children(), 2);

        drop(a);
        assert_eq!(control.active_children(), 1);
        drop(b);
        assert_eq!(control.active_children(), 0);
    }

    #[test]
    fn cancel_rejects_new_spawns_without_calling_spawn() {
        let control = DriverControl::new();
        control.request_cancellation();

        let outcome = control
            .try_register(|| -> Result<((), Option<u32>), ()> {
                panic!("spawn must not run after cancellation")
            })
            .unwrap();
        assert_eq!(outcome.unwrap_err(), Rejection::Canceled);
        assert!(control.is_canceled());
        assert!(!control.is_terminating());
    }

    #[test]
    fn cancel_takes_precedence_over_terminate() {
        let control = DriverControl::new();
        control.request_termination();
        let outcome = control.try_register(fake_spawn(None)).unwrap();
        assert_eq!(outcome.unwrap_err(), Rejection::Terminated);

        control.request_cancellation();
        let outcome = control.try_register(fake_spawn(None)).unwrap();
        assert_eq!(outcome.unwrap_err(), Rejection::Canceled);
    }

    #[test]
    fn spawn_errors_are_propagated_and_nothing_is_registered() {
        let control = DriverControl::new();
        let err = control
            .try_register(|| -> Result<((), Option<u32>), &str> { Err("no such file") })
            .unwrap_err();
        assert_eq!(err, "no such file");
        assert_eq!(control.active_children(), 0);
    }

    #[tokio::test]
    async fn stop_request_wakes_registered_drivers() {
        let control = DriverControl::new();
        let (_, mut reg) = control.try_register(fake_spawn(None)).unwrap().unwrap();

        let waiter = tokio::spawn(async move {
            reg.stop_requested().await;
            reg.id()
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        control.request_cancellation();
        let woken = tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .expect("stop request never woke the registration")
            .unwrap();
        assert_eq!(woken, ChildId(1));
    }

    #[test]
    fn independent_controls_do_not_share_flags() {
        let a = DriverControl::new();
        let b = DriverControl::new();
        ControlHandle::new(Arc::clone(&a)).request_termination();
        assert!(a.is_terminating());
        assert!(!b.is_terminating());
    }
}
