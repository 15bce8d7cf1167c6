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

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use jiff::Zoned;

/// Defines a fixed calendar period for rolling of a log file.
///
/// A rotated destination with base path `P` writes to `P.<suffix>`, where the suffix is derived
/// from the local time of the write.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Rotation {
    /// Roll over at the top of every hour; suffix `YYYYMMDDHH`.
    Hourly,
    /// Roll over at local midnight; suffix `YYYYMMDD`.
    Daily,
    /// Always write to the base path unmodified.
    Never,
}

impl Rotation {
    fn date_format(&self) -> Option<&'static str> {
        match *self {
            Rotation::Hourly => Some("%Y%m%d%H"),
            Rotation::Daily => Some("%Y%m%d"),
            Rotation::Never => None,
        }
    }

    /// Compute the file suffix for `now`, or `None` if this rotation never rolls.
    pub fn suffix(&self, now: &Zoned) -> Option<String> {
        self.date_format()
            .map(|format| now.strftime(format).to_string())
    }

    /// Map a base path and an instant to the suffix and the full path a write should target.
    pub fn resolve(&self, base: &Path, now: &Zoned) -> (Option<String>, PathBuf) {
        match self.suffix(now) {
            None => (None, base.to_path_buf()),
            Some(suffix) => {
                let mut path = OsString::from(base.as_os_str());
                path.push(".");
                path.push(&suffix);
                (Some(suffix), PathBuf::from(path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn at(s: &str) -> Zoned {
        Zoned::from_str(s).unwrap()
    }

    #[test]
    fn test_suffix_per_granularity() {
        let now = at("2024-08-10T17:12:52+08:00[+08:00]");
        assert_eq!(Rotation::Hourly.suffix(&now).as_deref(), Some("2024081017"));
        assert_eq!(Rotation::Daily.suffix(&now).as_deref(), Some("20240810"));
        assert_eq!(Rotation::Never.suffix(&now), None);
    }

    #[test]
    fn test_resolve_appends_suffix_to_base_path() {
        let now = at("2024-06-15T10:00:00+00:00[UTC]");
        let base = Path::new("logs/app.log");

        let (suffix, path) = Rotation::Daily.resolve(base, &now);
        assert_eq!(suffix.as_deref(), Some("20240615"));
        assert_eq!(path, PathBuf::from("logs/app.log.20240615"));

        let (suffix, path) = Rotation::Hourly.resolve(base, &now);
        assert_eq!(suffix.as_deref(), Some("2024061510"));
        assert_eq!(path, PathBuf::from("logs/app.log.2024061510"));

        let (suffix, path) = Rotation::Never.resolve(base, &now);
        assert_eq!(suffix, None);
        assert_eq!(path, PathBuf::from("logs/app.log"));
    }

    #[test]
    fn test_suffix_changes_across_boundaries() {
        let before = at("2024-06-15T23:59:59+00:00[UTC]");
        let after = at("2024-06-16T00:00:00+00:00[UTC]");
        assert_ne!(Rotation::Daily.suffix(&before), Rotation::Daily.suffix(&after));
        assert_ne!(Rotation::Hourly.suffix(&before), Rotation::Hourly.suffix(&after));

        let within = at("2024-06-15T23:00:00+00:00[UTC]");
        assert_eq!(Rotation::Hourly.suffix(&before), Rotation::Hourly.suffix(&within));
    }
}
