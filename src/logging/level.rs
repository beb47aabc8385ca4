//! Log levels and level gating
//!
//! Six fixed levels ordered by severity. Lower rank means more severe, and a
//! threshold admits every level whose rank is at or below its own.

use crate::error::{LogError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
    Verbose,
    Debug,
    Silly,
}

impl Level {
    /// All levels, most severe first
    pub const ALL: [Level; 6] = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Verbose,
        Level::Debug,
        Level::Silly,
    ];

    /// Numeric rank (error = 0 ... silly = 5)
    #[inline]
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Lowercase name, also used as the level's sink name
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Verbose => "verbose",
            Level::Debug => "debug",
            Level::Silly => "silly",
        }
    }

    /// Index into per-level tables
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        Level::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| LogError::UnknownLevel {
                name: s.to_string(),
            })
    }
}

/// True if a record at `level` passes a gate set to `threshold`
#[inline]
pub fn should_log(level: Level, threshold: Level) -> bool {
    level.rank() <= threshold.rank()
}
