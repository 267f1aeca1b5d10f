// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs one driver from spawn to exit using
//! `tokio::process::Command`:
//!
//! - [`launcher`] checks the shared control state and spawns + registers the
//!   driver in one critical section.
//! - [`multiplexer`] owns the running child: it feeds stdin, decodes stdout
//!   lines, collects stderr, enforces the idle and exit-grace timeouts, and
//!   reaps the process.
//! - [`stderr`] accumulates raw stderr.
//! - [`synthesize`] builds the final result from the exit code, the last
//!   progress object and stderr.

pub mod launcher;
pub mod multiplexer;
pub mod stderr;
pub mod synthesize;

pub use launcher::{Launch, launch};
pub use multiplexer::{MultiplexOutcome, multiplex};
pub use stderr::StderrBuffer;
pub use synthesize::synthesize_result;
