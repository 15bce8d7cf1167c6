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

//! A bridge to forward logs from the `log` crate to a destination.

use std::sync::Arc;

use crate::Destination;
use crate::Error;
use crate::ErrorKind;
use crate::Level;
use crate::Logger;
use crate::Trap;
use crate::trap::DefaultTrap;

/// Forwards `log` crate records to a [`Destination`].
///
/// `log::Level::Warn` maps to [`Level::Warning`]; the other levels map by name. Errors have no
/// caller to return to and go to the trap instead.
#[derive(Debug)]
pub struct LogBridge {
    destination: Arc<Destination>,
    trap: Box<dyn Trap>,
}

impl LogBridge {
    pub fn new(destination: Arc<Destination>) -> Self {
        Self {
            destination,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for write and flush errors.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Set up the log crate global logger.
    ///
    /// This function will set the global maximum log level to `Trace`; the destination's own
    /// minimum level still applies.
    ///
    /// # Errors
    ///
    /// Return an error if the log crate global logger has already been set.
    pub fn try_apply(self) -> Result<(), Error> {
        log::set_boxed_logger(Box::new(self)).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "failed to set up log crate logger").with_source(err)
        })?;
        log::set_max_level(log::LevelFilter::Trace);
        Ok(())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.destination.enabled(Level::from(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let level = Level::from(record.level());
        if !self.destination.enabled(level) {
            return;
        }

        let result = match record.args().as_str() {
            Some(message) => Logger::log(&*self.destination, level, message),
            None => Logger::log(&*self.destination, level, &record.args().to_string()),
        };
        if let Err(err) = result {
            self.trap.trap(&err);
        }
    }

    fn flush(&self) {
        if let Err(err) = self.destination.flush() {
            self.trap.trap(&err);
        }
    }
}
