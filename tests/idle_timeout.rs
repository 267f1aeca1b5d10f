mod common;
use crate::common::{ProgressRecorder, ScriptDriver, config, init_tracing, with_timeout};

use std::error::Error;
use std::time::{Duration, Instant};

use serde_json::json;

use drivertrack::DriverEngine;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn silent_driver_is_terminated_after_idle_timeout() -> TestResult {
    init_tracing();

    let engine = DriverEngine::new(config().with_io_timeout(Some(Duration::from_millis(300))));
    let driver = ScriptDriver::new().sh("exec sleep 30");

    let started = Instant::now();
    let result = with_timeout(engine.run(&driver.invocation(), ProgressRecorder::new().callback()))
        .await?;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.status(), Some("failed"));
    assert_eq!(result.reason(), Some("unknown"));
    assert_eq!(engine.handle().active_children(), 0);
    // Only this driver was stopped, not the engine.
    assert!(!engine.handle().is_terminating());
    Ok(())
}

#[tokio::test]
async fn steady_progress_keeps_the_driver_alive() -> TestResult {
    init_tracing();

    let engine = DriverEngine::new(config().with_io_timeout(Some(Duration::from_secs(2))));
    let recorder = ProgressRecorder::new();
    let driver = ScriptDriver::new()
        .emit(r#"{"progress":25}"#)
        .sh("sleep 0.3")
        .emit(r#"{"progress":50}"#)
        .sh("sleep 0.3")
        .emit(r#"{"progress":100,"status":"ok"}"#)
        .exit(0);

    let result = with_timeout(engine.run(&driver.invocation(), recorder.callback())).await?;

    assert_eq!(recorder.len(), 3);
    assert_eq!(result.into_value(), json!({"progress": 100, "status": "ok"}));
    Ok(())
}

#[tokio::test]
async fn driver_ignoring_termination_is_killed_once_its_output_closes() -> TestResult {
    init_tracing();

    // Ignores SIGTERM; closes its streams on the first idle timeout and
    // then lingers until killed.
    let engine = DriverEngine::new(
        config()
            .with_io_timeout(Some(Duration::from_millis(300)))
            .with_exit_timeout(Duration::from_millis(300)),
    );
    let driver = ScriptDriver::new()
        .sh("trap 'exec >&- 2>&-' TERM")
        .sh("while :; do sleep 0.1; done");

    let result = with_timeout(engine.run(&driver.invocation(), ProgressRecorder::new().callback()))
        .await?;

    assert_eq!(result.status(), Some("failed"));
    assert_eq!(engine.handle().active_children(), 0);
    Ok(())
}

#[tokio::test]
async fn silent_driver_ignoring_termination_is_killed_after_grace() -> TestResult {
    init_tracing();

    let engine = DriverEngine::new(
        config()
            .with_io_timeout(Some(Duration::from_millis(300)))
            .with_exit_timeout(Duration::from_millis(300)),
    );
    let driver = ScriptDriver::new().sh("trap '' TERM").sh("exec sleep 30");

    let started = Instant::now();
    let result = with_timeout(engine.run(&driver.invocation(), ProgressRecorder::new().callback()))
        .await?;

    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    assert_eq!(result.status(), Some("failed"));
    assert_eq!(result.reason(), Some("unknown"));
    assert_eq!(engine.handle().active_children(), 0);
    Ok(())
}
