// src/cli.rs

//! CLI argument parsing using `clap`.

use std::ffi::OsString;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `drivertrack`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "drivertrack",
    version,
    about = "Run a line-delimited JSON driver and print its final result.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Drivertrack.toml` is used when it exists; otherwise
    /// built-in defaults apply. `OPTUNE_*` variables override either.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// JSON value sent to the driver on stdin.
    #[arg(long, value_name = "JSON")]
    pub input: Option<String>,

    /// Echo the command line, every stdout line and the response.
    #[arg(long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DRIVERTRACK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Driver executable.
    #[arg(value_name = "PROGRAM")]
    pub program: String,

    /// Arguments passed to the driver.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<OsString>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_arguments_may_look_like_flags() {
        let args = CliArgs::try_parse_from([
            "drivertrack",
            "--input",
            "{\"a\":1}",
            "./driver",
            "measure",
            "--app",
            "web",
        ])
        .unwrap();

        assert_eq!(args.program, "./driver");
        assert_eq!(args.input.as_deref(), Some("{\"a\":1}"));
        assert_eq!(args.args, ["measure", "--app", "web"]);
        assert!(!args.verbose);
    }

    #[test]
    fn program_is_required() {
        assert!(CliArgs::try_parse_from(["drivertrack"]).is_err());
    }
}
