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

use crate::Level;
use crate::Rotation;

/// Initial configuration of a [`Destination`](crate::Destination).
///
/// Default to timestamped lines, caching enabled, daily rotation and the lowest minimum level.
///
/// # Examples
///
/// ```
/// use logspool::Level;
/// use logspool::Options;
/// use logspool::Rotation;
///
/// let options = Options::default()
///     .rotation(Rotation::Hourly)
///     .level(Level::Info)
///     .timestamp(false);
/// assert_eq!(options.get_rotation(), Rotation::Hourly);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    timestamp: bool,
    caching: bool,
    rotation: Rotation,
    level: Level,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timestamp: true,
            caching: true,
            rotation: Rotation::Daily,
            level: Level::LOWEST,
        }
    }
}

impl Options {
    /// Set whether each line is prefixed with a `YYYY-MM-DD HH:MM:SS` local timestamp.
    #[must_use]
    pub fn timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set whether lines are buffered in memory and flushed in the background.
    ///
    /// When disabled, every write goes to disk synchronously.
    #[must_use]
    pub fn caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    /// Set the rotation policy.
    #[must_use]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the minimum level; messages below it are dropped.
    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn get_timestamp(&self) -> bool {
        self.timestamp
    }

    pub fn get_caching(&self) -> bool {
        self.caching
    }

    pub fn get_rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn get_level(&self) -> Level {
        self.level
    }
}
