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

use crate::Destination;
use crate::Error;
use crate::Level;

/// The leveled logging contract callers program against.
///
/// Each severity call renders `[LEVEL] message` and hands it to [`Logger::log`].
///
/// # Examples
///
/// ```
/// use logspool::Level;
/// use logspool::Logger;
/// use logspool::Options;
/// use logspool::Registry;
/// use logspool::Rotation;
///
/// let dir = tempfile::tempdir().unwrap();
/// let registry = Registry::with_options(Options::default().rotation(Rotation::Never));
/// let logger = registry.get_or_create(dir.path().join("app.log"));
///
/// logger.set_level(Level::Info);
/// logger.debug("dropped").unwrap();
/// logger.info("kept").unwrap();
/// logger.flush().unwrap();
///
/// let content = std::fs::read_to_string(dir.path().join("app.log")).unwrap();
/// assert!(content.ends_with("[INFO] kept\n"));
/// ```
pub trait Logger: fmt::Debug + Send + Sync {
    /// Log `message` at `level`.
    fn log(&self, level: Level, message: &str) -> Result<(), Error>;

    /// Set the minimum level; messages below it are dropped.
    fn set_level(&self, level: Level);

    /// Persist everything logged so far, blocking until done.
    fn flush(&self) -> Result<(), Error>;

    fn trace(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Trace, message)
    }

    fn debug(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Debug, message)
    }

    fn info(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Info, message)
    }

    fn notice(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Notice, message)
    }

    fn warning(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Warning, message)
    }

    fn error(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Error, message)
    }

    fn critical(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Critical, message)
    }

    fn alert(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Alert, message)
    }

    fn emergency(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Emergency, message)
    }
}

impl Logger for Destination {
    fn log(&self, level: Level, message: &str) -> Result<(), Error> {
        // skip formatting for lines that would be dropped anyway
        if !self.enabled(level) {
            return Ok(());
        }
        self.write(&format!("[{level}] {message}"), level)
    }

    fn set_level(&self, level: Level) {
        Destination::set_level(self, level);
    }

    fn flush(&self) -> Result<(), Error> {
        Destination::flush(self)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::str::FromStr;
    use std::sync::Arc;

    use jiff::Zoned;
    use tempfile::TempDir;

    use super::*;
    use crate::Options;
    use crate::Registry;
    use crate::clock::Clock;
    use crate::clock::ManualClock;

    #[test]
    fn test_every_severity_has_its_label() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let now = Zoned::from_str("2024-06-15T10:00:00+00:00[UTC]").unwrap();
        let registry = Registry::with_clock(
            Options::default().timestamp(false),
            Clock::ManualClock(ManualClock::new(now)),
        );
        let logger: Arc<dyn Logger> = registry.get_or_create(temp_dir.path().join("all.log"));

        logger.trace("t").unwrap();
        logger.debug("d").unwrap();
        logger.info("i").unwrap();
        logger.notice("n").unwrap();
        logger.warning("w").unwrap();
        logger.error("e").unwrap();
        logger.critical("c").unwrap();
        logger.alert("a").unwrap();
        logger.emergency("em").unwrap();
        logger.flush().unwrap();

        let content = fs::read_to_string(temp_dir.path().join("all.log.20240615")).unwrap();
        assert_eq!(
            content,
            "[TRACE] t\n[DEBUG] d\n[INFO] i\n[NOTICE] n\n[WARNING] w\n[ERROR] e\n\
             [CRITICAL] c\n[ALERT] a\n[EMERGENCY] em\n"
        );
    }

    #[test]
    fn test_set_level_through_the_trait() {
        let registry = Registry::new();
        let destination = registry.get_or_create("unused.log");
        let logger: &dyn Logger = &*destination;

        logger.set_level(Level::Error);
        assert_eq!(destination.level(), Level::Error);
        logger.warning("dropped").unwrap();
        assert_eq!(destination.buffered(), 0);
    }
}
