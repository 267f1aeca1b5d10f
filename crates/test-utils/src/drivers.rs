//! Throwaway drivers written as `sh -c` scripts.
//!
//! Running the script text through `sh -c` (instead of writing an executable
//! file) keeps parallel tests clear of `ETXTBSY` races.

use drivertrack::Invocation;

/// Builder for a shell-script driver.
#[derive(Debug, Default, Clone)]
pub struct ScriptDriver {
    lines: Vec<String>,
}

impl ScriptDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw shell statement.
    pub fn sh(mut self, stmt: &str) -> Self {
        self.lines.push(stmt.to_string());
        self
    }

    /// Print `json` as one stdout line.
    pub fn emit(self, json: &str) -> Self {
        let stmt = format!("printf '%s\\n' '{}'", json.replace('\'', r"'\''"));
        self.sh(&stmt)
    }

    /// Write `text` to stderr verbatim.
    pub fn stderr(self, text: &str) -> Self {
        let stmt = format!("printf '%s' '{}' >&2", text.replace('\'', r"'\''"));
        self.sh(&stmt)
    }

    pub fn exit(self, code: i32) -> Self {
        self.sh(&format!("exit {code}"))
    }

    pub fn script(&self) -> String {
        self.lines.join("\n")
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::new("sh").arg("-c").arg(self.script())
    }
}

/// Driver that echoes its stdin back as a single stdout line.
pub fn echo_driver() -> ScriptDriver {
    ScriptDriver::new().sh("cat").sh("echo")
}
