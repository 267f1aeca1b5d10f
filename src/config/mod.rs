// src/config/mod.rs

//! Configuration loading and validation for drivertrack.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the validated `EngineConfig` (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Overlay the `OPTUNE_*` environment variables (`env.rs`).

pub mod env;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{EngineConfig, EngineSection, RawConfigFile};
