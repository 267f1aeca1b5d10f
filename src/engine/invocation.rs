// src/engine/invocation.rs

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{DriverTrackError, Result};

/// One request to run a driver: program, arguments, and an optional JSON
/// payload written to its stdin.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    input: Option<Value>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn input_value(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    /// Bytes written to the driver's stdin; empty when there is no input.
    pub fn payload(&self) -> Result<Vec<u8>> {
        match &self.input {
            None => Ok(Vec::new()),
            Some(value) => serde_json::to_vec(value).map_err(|e| {
                DriverTrackError::Other(anyhow::anyhow!(
                    "serializing input for driver '{}': {e}",
                    self.program_name()
                ))
            }),
        }
    }

    /// Program and arguments as one human-readable string, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program_name())
            .chain(self.args.iter().map(|a| format!("{:?}", a.to_string_lossy())))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
