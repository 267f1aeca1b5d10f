// src/engine/mod.rs

//! Driver-execution engine.
//!
//! A [`DriverEngine`] owns one shared [`DriverControl`](crate::control::DriverControl)
//! and runs [`Invocation`]s against it: launch, multiplex until exit, then
//! synthesize the result. Any number of invocations may run concurrently on
//! one engine; stop requests issued through [`DriverEngine::handle`] reach
//! all of them.

pub mod invocation;
pub mod runtime;

pub use invocation::Invocation;
pub use runtime::DriverEngine;
