// src/exec/multiplexer.rs

//! The per-driver I/O loop.
//!
//! Each iteration waits (bounded by the idle timeout) for whichever comes
//! first of: a complete stdout line, a chunk of stderr, room to write the
//! next piece of the stdin payload, or a stop request. Once both output
//! streams reach EOF the process is reaped.
//!
//! Any stop (a global termination/cancellation request, the idle timeout, or
//! the callback asking to abort) arms a single exit-grace deadline. A driver
//! still running when it passes is killed, whether or not its streams are
//! closed.
//!
//! Every branch raced in `select!` is cancellation safe
//! (`Lines::next_line`, `AsyncReadExt::read`, `AsyncWriteExt::write`,
//! `watch::Receiver::wait_for`, `sleep_until`), so losing a race or hitting
//! the idle timeout never drops data.

use std::ops::ControlFlow;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::time::{Instant, sleep_until, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::control::{DriverSignal, Registration};
use crate::errors::{DriverTrackError, Result};
use crate::exec::stderr::{STDERR_CHUNK, StderrBuffer};
use crate::protocol::{Dispatch, LineDispatcher, ProgressObject};

/// Largest single stdin write; at most `PIPE_BUF`, so a write to a pipe
/// with room for it never blocks part-way.
pub const STDIN_CHUNK: usize = 512;

/// Exit code reported when the OS would not give us the driver's status.
pub const UNREAPED_EXIT_CODE: i32 = -1;

/// Everything the loop learned about a driver that ran to exit.
#[derive(Debug)]
pub struct MultiplexOutcome {
    pub exit_code: i32,
    pub candidate: Option<ProgressObject>,
    pub stderr: StderrBuffer,
    /// Number of progress objects handed to the callback.
    pub delivered: usize,
    /// The callback asked to stop the driver at some point.
    pub aborted: bool,
}

enum Activity {
    Stdout(std::io::Result<Option<String>>),
    Stderr(std::io::Result<usize>),
    Stdin(std::io::Result<usize>),
    StopRequested,
    GraceExpired,
    Idle(Duration),
}

/// Drive `child` to completion.
///
/// `registration` is dropped (deregistering the driver) only after the
/// child has been reaped, or after it has been killed and abandoned on a
/// protocol violation.
pub async fn multiplex<F>(
    mut child: Child,
    mut registration: Registration,
    program: &str,
    payload: &[u8],
    config: &EngineConfig,
    on_progress: &mut F,
) -> Result<MultiplexOutcome>
where
    F: FnMut(&ProgressObject) -> ControlFlow<()>,
{
    let (Some(stdin), Some(stdout), Some(mut stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        abandon(&mut child, registration);
        return Err(DriverTrackError::Other(anyhow::anyhow!(
            "driver '{program}' was spawned without piped standard streams"
        )));
    };

    let mut lines = BufReader::new(stdout).lines();
    // An absent payload closes stdin straight away.
    let mut stdin = (!payload.is_empty()).then_some(stdin);
    let mut cursor = 0usize;

    let mut stdout_done = false;
    let mut stderr_done = false;
    let mut abort_sent = false;
    let mut grace_deadline: Option<Instant> = None;
    let mut chunk = [0u8; STDERR_CHUNK];
    let mut stderr_buf = StderrBuffer::new();
    let mut dispatcher = LineDispatcher::new();

    let code = loop {
        if stdout_done && stderr_done {
            let deadline = grace_deadline.unwrap_or_else(|| Instant::now() + config.exit_timeout);
            break reap(&mut child, deadline, program).await;
        }

        let pending = &payload[cursor..(cursor + STDIN_CHUNK).min(payload.len())];
        let wait = async {
            tokio::select! {
                line = lines.next_line(), if !stdout_done => Activity::Stdout(line),
                read = stderr.read(&mut chunk), if !stderr_done => Activity::Stderr(read),
                written = write_chunk(stdin.as_mut(), pending), if stdin.is_some() => {
                    Activity::Stdin(written)
                }
                _ = registration.stop_requested(), if grace_deadline.is_none() => {
                    Activity::StopRequested
                }
                _ = sleep_until(grace_deadline.unwrap_or_else(Instant::now)),
                    if grace_deadline.is_some() =>
                {
                    Activity::GraceExpired
                }
            }
        };

        let activity = match config.io_timeout {
            Some(limit) => timeout(limit, wait).await.unwrap_or(Activity::Idle(limit)),
            None => wait.await,
        };

        match activity {
            Activity::Idle(limit) => {
                warn!(
                    program,
                    timeout_secs = limit.as_secs(),
                    "timed out waiting for driver output; requesting termination"
                );
                registration.signal(DriverSignal::Terminate);
                arm_grace(&mut grace_deadline, config.exit_timeout);
            }
            Activity::StopRequested => {
                debug!(program, "stop requested; waiting out the exit grace period");
                arm_grace(&mut grace_deadline, config.exit_timeout);
            }
            Activity::GraceExpired => {
                warn!(
                    program,
                    grace_secs = config.exit_timeout.as_secs_f64(),
                    "driver did not stop within the grace period; killing it"
                );
                break force_kill(&mut child, program).await;
            }

            Activity::Stderr(Ok(0)) => {
                debug!(program, "driver stderr closed");
                stderr_done = true;
            }
            Activity::Stderr(Ok(n)) => stderr_buf.append(&chunk[..n]),
            Activity::Stderr(Err(e)) => {
                warn!(program, error = %e, "failed to read driver stderr; ignoring the rest");
                stderr_done = true;
            }

            Activity::Stdout(Ok(None)) => {
                debug!(program, "driver stdout closed");
                stdout_done = true;
            }
            Activity::Stdout(Ok(Some(line))) => {
                if config.verbose {
                    info!(program, line = %line.trim(), "driver stdout");
                }
                match dispatcher.dispatch(&line, &mut *on_progress) {
                    Ok(Dispatch::AbortRequested) if !abort_sent => {
                        info!(program, "progress callback requested abort; terminating driver");
                        registration.signal(DriverSignal::Terminate);
                        abort_sent = true;
                        arm_grace(&mut grace_deadline, config.exit_timeout);
                    }
                    Ok(_) => {}
                    Err(reason) => {
                        abandon(&mut child, registration);
                        return Err(DriverTrackError::Protocol {
                            program: program.to_string(),
                            line: line.trim().to_string(),
                            reason,
                        });
                    }
                }
            }
            Activity::Stdout(Err(source)) => {
                abandon(&mut child, registration);
                return Err(DriverTrackError::StdoutRead {
                    program: program.to_string(),
                    source,
                });
            }

            Activity::Stdin(Ok(n)) if n > 0 => {
                cursor += n;
                if cursor >= payload.len() {
                    debug!(program, bytes = payload.len(), "request delivered; closing stdin");
                    stdin = None;
                }
            }
            Activity::Stdin(Ok(_)) => {
                debug!(program, "driver stdin accepted no bytes; closing it");
                stdin = None;
            }
            Activity::Stdin(Err(e)) => {
                debug!(program, error = %e, "driver stopped reading stdin; closing it");
                stdin = None;
            }
        }
    };

    // Reaped: only now may the driver leave the registry.
    drop(registration);

    Ok(MultiplexOutcome {
        exit_code: code,
        delivered: dispatcher.delivered(),
        candidate: dispatcher.into_candidate(),
        stderr: stderr_buf,
        aborted: abort_sent,
    })
}

async fn write_chunk(stdin: Option<&mut ChildStdin>, bytes: &[u8]) -> std::io::Result<usize> {
    match stdin {
        Some(pipe) => pipe.write(bytes).await,
        None => std::future::pending().await,
    }
}

/// Start the exit-grace countdown unless one is already running.
fn arm_grace(deadline: &mut Option<Instant>, grace: Duration) {
    if deadline.is_none() {
        *deadline = Some(Instant::now() + grace);
    }
}

/// Wait until `deadline` for a driver whose output streams are both closed,
/// killing it if it is still running by then.
async fn reap(child: &mut Child, deadline: Instant, program: &str) -> i32 {
    match child.try_wait() {
        Ok(Some(status)) => return exit_code(status),
        Ok(None) => {}
        Err(e) => {
            warn!(program, error = %e, "failed to poll driver exit status; killing it");
            return force_kill(child, program).await;
        }
    }

    match timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => exit_code(status),
        Ok(Err(e)) => {
            warn!(program, error = %e, "failed to wait for driver; killing it");
            force_kill(child, program).await
        }
        Err(_) => {
            warn!(program, "driver lingered past the grace period; killing it");
            force_kill(child, program).await
        }
    }
}

/// `SIGKILL` the driver and collect its exit code.
async fn force_kill(child: &mut Child, program: &str) -> i32 {
    if let Err(e) = child.start_kill() {
        debug!(program, error = %e, "driver already gone when killing it");
    }
    match child.wait().await {
        Ok(status) => exit_code(status),
        Err(e) => {
            warn!(program, error = %e, "could not reap killed driver");
            UNREAPED_EXIT_CODE
        }
    }
}

/// Kill a driver we are giving up on and drop its registration.
fn abandon(child: &mut Child, registration: Registration) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "driver already gone while abandoning it");
    }
    drop(registration);
}

/// Exit code of `status`; a driver killed by signal `N` reports `-N`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return -sig;
        }
    }

    UNREAPED_EXIT_CODE
}
