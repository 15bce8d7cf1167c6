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

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::Destination;
use crate::Error;
use crate::Options;
use crate::clock::Clock;

/// The set of destinations, one per path.
///
/// Destinations are created lazily on first request and live as long as the registry. The
/// registry is usually wrapped in an [`Arc`] and shared with a [`Scheduler`](crate::Scheduler).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logspool::Registry;
///
/// let registry = Registry::new();
/// let a = registry.get_or_create("app.log");
/// let b = registry.get_or_create("app.log");
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug)]
pub struct Registry {
    destinations: RwLock<HashMap<PathBuf, Arc<Destination>>>,
    defaults: Options,
    clock: Clock,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry whose destinations start with [`Options::default`].
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Create an empty registry whose destinations start with `defaults`.
    pub fn with_options(defaults: Options) -> Self {
        Self {
            destinations: RwLock::new(HashMap::new()),
            defaults,
            clock: Clock::DefaultClock,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_clock(defaults: Options, clock: Clock) -> Self {
        Self {
            destinations: RwLock::new(HashMap::new()),
            defaults,
            clock,
        }
    }

    /// The options lazily created destinations start with.
    pub fn defaults(&self) -> Options {
        self.defaults
    }

    /// Return the destination for `path`, creating it with the registry defaults if absent.
    pub fn get_or_create(&self, path: impl AsRef<Path>) -> Arc<Destination> {
        self.get_or_create_with(path, self.defaults)
    }

    /// Return the destination for `path`, creating it with `options` if absent.
    ///
    /// `options` is ignored when the destination already exists.
    pub fn get_or_create_with(&self, path: impl AsRef<Path>, options: Options) -> Arc<Destination> {
        let path = path.as_ref();
        if let Some(destination) = self.get(path) {
            return destination;
        }

        self.destinations
            .write()
            .entry(path.to_path_buf())
            .or_insert_with(|| {
                Arc::new(Destination::new(
                    path.to_path_buf(),
                    options,
                    self.clock.clone(),
                ))
            })
            .clone()
    }

    /// Return the destination for `path` if it has been created.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<Destination>> {
        self.destinations.read().get(path.as_ref()).cloned()
    }

    pub fn len(&self) -> usize {
        self.destinations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of all destinations.
    pub fn destinations(&self) -> Vec<Arc<Destination>> {
        self.destinations.read().values().cloned().collect()
    }

    /// Visit every destination while holding the read lock. `f` must not block.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&Arc<Destination>)) {
        for destination in self.destinations.read().values() {
            f(destination);
        }
    }

    /// Flush every destination on the calling thread.
    ///
    /// # Errors
    ///
    /// Every destination is attempted. The first failure is returned, carrying any later
    /// failures as sources.
    pub fn flush_all(&self) -> Result<(), Error> {
        let mut result: Result<(), Error> = Ok(());
        for destination in self.destinations() {
            if let Err(err) = destination.flush() {
                result = match result {
                    Ok(()) => Err(err),
                    Err(first) => Err(first.with_source(err)),
                };
            }
        }
        result
    }
}
