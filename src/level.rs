// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::ErrorKind;

/// An enum representing the available severity levels, from the most verbose to the most severe.
///
/// A destination drops every message whose level is below its minimum level.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum Level {
    /// Designates very low priority, often extremely verbose, information.
    Trace = 0,
    /// Designates lower priority information.
    Debug = 1,
    /// Designates useful information.
    Info = 2,
    /// Designates normal but significant conditions.
    Notice = 3,
    /// Designates hazardous situations.
    Warning = 4,
    /// Designates errors.
    Error = 5,
    /// Designates critical conditions.
    Critical = 6,
    /// Designates conditions that must be acted on immediately.
    Alert = 7,
    /// Designates an unusable system.
    Emergency = 8,
}

impl Level {
    /// The least severe level; a destination at this level keeps everything.
    pub const LOWEST: Level = Level::Trace;

    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Alert => "ALERT",
            Level::Emergency => "EMERGENCY",
        }
    }

    pub(crate) fn from_u8(n: u8) -> Level {
        match n {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Notice,
            4 => Level::Warning,
            5 => Level::Error,
            6 => Level::Critical,
            7 => Level::Alert,
            _ => Level::Emergency,
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;
    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for (name, level) in [
            ("trace", Level::Trace),
            ("debug", Level::Debug),
            ("info", Level::Info),
            ("notice", Level::Notice),
            ("warning", Level::Warning),
            ("error", Level::Error),
            ("critical", Level::Critical),
            ("alert", Level::Alert),
            ("emergency", Level::Emergency),
        ] {
            if s.eq_ignore_ascii_case(name) {
                return Ok(level);
            }
        }

        Err(Error::new(
            ErrorKind::Unexpected,
            format!("malformed level: {s:?}"),
        ))
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        let levels = [
            Level::Trace,
            Level::Debug,
            Level::Info,
            Level::Notice,
            Level::Warning,
            Level::Error,
            Level::Critical,
            Level::Alert,
            Level::Emergency,
        ];
        for pair in levels.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for level in levels {
            assert_eq!(Level::from_u8(level as u8), level);
        }
        assert_eq!(Level::LOWEST, Level::Trace);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("EMERGENCY".parse::<Level>().unwrap(), Level::Emergency);
        assert_eq!("Notice".parse::<Level>().unwrap(), Level::Notice);

        let err = "loud".parse::<Level>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.message(), r#"malformed level: "loud""#);
    }

    #[test]
    fn test_log_crate_levels_map() {
        assert_eq!(Level::from(log::Level::Warn), Level::Warning);
        assert_eq!(Level::from(log::Level::Error).to_string(), "ERROR");
    }
}
