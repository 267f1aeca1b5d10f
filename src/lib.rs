// src/lib.rs

//! Host side of a line-delimited JSON protocol for external "driver"
//! programs.
//!
//! A driver is spawned with piped stdio, receives an optional JSON request on
//! stdin, reports progress as one JSON object per stdout line, and exits.
//! [`DriverEngine::run`] streams each progress object to a callback and
//! returns the last one (or a synthesized failure) as the result, while
//! [`ControlHandle`] lets any thread cancel or terminate every running
//! driver.

pub mod cli;
pub mod config;
pub mod control;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod protocol;
pub mod types;

use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{EngineConfig, default_config_path, load_and_validate};

pub use crate::control::{ControlHandle, DriverControl, DriverSignal};
pub use crate::engine::{DriverEngine, Invocation};
pub use crate::errors::DriverTrackError;
pub use crate::protocol::ProgressObject;
pub use crate::types::StderrMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, then `OPTUNE_*` environment)
/// - one driver invocation
/// - Ctrl-C → termination, `SIGUSR1` → cancellation
///
/// The final result is printed to stdout as a single JSON line.
pub async fn run(args: CliArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if args.verbose {
        config.verbose = true;
    }
    debug!(?config, "engine configuration");

    let mut invocation = Invocation::new(&args.program).args(args.args.iter().cloned());
    if let Some(raw) = args.input.as_deref() {
        let value: serde_json::Value =
            serde_json::from_str(raw).context("parsing --input as JSON")?;
        invocation = invocation.input(value);
    }

    let engine = DriverEngine::new(config);
    spawn_stop_handlers(engine.handle());

    let result = engine
        .run(&invocation, |progress| {
            info!(%progress, "driver progress");
            ControlFlow::Continue(())
        })
        .await?;

    println!("{result}");
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let path = match path {
        Some(p) => PathBuf::from(p),
        None => {
            let default = default_config_path();
            if !default.exists() {
                return Ok(EngineConfig::default());
            }
            default
        }
    };

    load_and_validate(&path).with_context(|| format!("loading config from {}", path.display()))
}

/// Ctrl-C terminates running drivers; `SIGUSR1` cancels them.
fn spawn_stop_handlers(handle: ControlHandle) {
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; terminating driver");
            handle.request_termination();
        });
    }

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};

        let mut usr1 = match signal(SignalKind::user_defined1()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to listen for SIGUSR1: {e}");
                return;
            }
        };
        if usr1.recv().await.is_some() {
            info!("SIGUSR1 received; cancelling driver");
            handle.request_cancellation();
        }
    });

    #[cfg(not(unix))]
    drop(handle);
}
