//! Control commands carried on the shutdown directive channel.

use std::fmt;
use std::str::FromStr;

/// A recognized single-token command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Written by the circuit breaker on breach.
    Exit,
    /// Operator-issued; same effect as `Exit`.
    Stop,
}

impl ControlCommand {
    pub const fn token(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Stop => "stop",
        }
    }

    /// Both commands request an orderly shutdown.
    pub const fn requests_shutdown(self) -> bool {
        matches!(self, Self::Exit | Self::Stop)
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ControlCommand {
    type Err = String;

    /// Accepts exactly one whitespace-separated token.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["exit"] => Ok(Self::Exit),
            ["stop"] => Ok(Self::Stop),
            _ => Err(tokens.join(" ")),
        }
    }
}
