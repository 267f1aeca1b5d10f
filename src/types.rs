use std::str::FromStr;
use serde::Deserialize;

/// How much of a failed driver's stderr is copied into the result `message`.
///
/// - `All`: the complete stderr text (default).
/// - `Minimal`: only its first two lines.
/// - `None`: nothing; stderr is still echoed to the log.
///
/// Any unrecognised setting means `None`, so a typo can only ever make the
/// result quieter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum StderrMode {
    All,
    Minimal,
    None,
}

impl Default for StderrMode {
    fn default() -> Self {
        StderrMode::All
    }
}

impl FromStr for StderrMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "all" => StderrMode::All,
            "minimal" => StderrMode::Minimal,
            _ => StderrMode::None,
        })
    }
}

impl From<String> for StderrMode {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }
}
