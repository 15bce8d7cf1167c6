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

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use jiff::Zoned;

use crate::Error;
use crate::ErrorKind;
use crate::Rotation;

/// Holds at most one open handle for a destination, keyed by the rotation suffix it was opened
/// for.
///
/// Callers serialize on the destination's rotation lock; nothing in here is synchronized.
#[derive(Debug)]
pub(crate) struct FileHandleCache {
    base: PathBuf,
    rotation: Rotation,
    current: Option<OpenFile>,
    #[cfg(test)]
    failing_writes: usize,
}

#[derive(Debug)]
struct OpenFile {
    // `None` when rotation is disabled
    suffix: Option<String>,
    path: PathBuf,
    file: File,
}

impl FileHandleCache {
    pub(crate) fn new(base: PathBuf, rotation: Rotation) -> Self {
        Self {
            base,
            rotation,
            current: None,
            #[cfg(test)]
            failing_writes: 0,
        }
    }

    pub(crate) fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Change the rotation. The cached handle is kept until the next resolve notices the suffix
    /// no longer matches.
    pub(crate) fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    /// Path of the currently open file, if any.
    pub(crate) fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|open| open.path.as_path())
    }

    /// Return the handle matching the suffix for `now`, opening it (and closing the previous
    /// one) if needed.
    fn resolve(&mut self, now: &Zoned) -> Result<&mut OpenFile, Error> {
        let suffix = self.rotation.suffix(now);

        let stale = match &self.current {
            Some(open) => open.suffix != suffix,
            None => true,
        };

        if stale {
            let (suffix, path) = self.rotation.resolve(&self.base, now);
            let file = open_file(&path)?;
            // the previous handle is closed only once its replacement is open
            let previous = self.current.replace(OpenFile { suffix, path, file });
            drop(previous);
        }

        self.current
            .as_mut()
            .ok_or_else(|| Error::new(ErrorKind::Unexpected, "no log file is open"))
    }

    /// Write `bytes` with a single write call to the rotation-correct file for `now`.
    pub(crate) fn write_all(&mut self, now: &Zoned, bytes: &[u8]) -> Result<(), Error> {
        #[cfg(test)]
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(Error::new(ErrorKind::Write, "injected write failure"));
        }

        let open = self.resolve(now)?;
        open.file
            .write_all(bytes)
            .map_err(|err| Error::write_failed(err).with_context("path", open.path.display()))
    }

    /// Drop the cached handle so the next resolve reopens the file.
    pub(crate) fn invalidate(&mut self) {
        self.current = None;
    }

    /// Make the next `count` writes fail before touching the file.
    #[cfg(test)]
    pub(crate) fn fail_next_writes(&mut self, count: usize) {
        self.failing_writes = count;
    }
}

fn open_file(path: &Path) -> Result<File, Error> {
    let mut open_options = OpenOptions::new();
    open_options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open_options.mode(0o666);
    }
    open_options
        .open(path)
        .map_err(|err| Error::open_failed(err).with_context("path", path.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::str::FromStr;

    use tempfile::TempDir;

    use super::*;

    fn at(s: &str) -> Zoned {
        Zoned::from_str(s).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_reuses_handle_within_one_suffix() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app.log");
        let mut cache = FileHandleCache::new(base.clone(), Rotation::Daily);

        cache
            .write_all(&at("2024-06-15T10:00:00+00:00[UTC]"), b"one\n")
            .unwrap();
        let first = cache.current_path().unwrap().to_path_buf();

        // remove the file behind the cached handle; a reopen would recreate it
        fs::remove_file(&first).unwrap();
        cache
            .write_all(&at("2024-06-15T23:59:59+00:00[UTC]"), b"two\n")
            .unwrap();
        assert!(!first.exists());
        assert_eq!(cache.current_path(), Some(first.as_path()));
    }

    #[test]
    fn test_rotates_on_suffix_change() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app.log");
        let mut cache = FileHandleCache::new(base.clone(), Rotation::Hourly);

        cache
            .write_all(&at("2024-06-15T10:59:59+00:00[UTC]"), b"before\n")
            .unwrap();
        cache
            .write_all(&at("2024-06-15T11:00:00+00:00[UTC]"), b"after\n")
            .unwrap();

        let before = temp_dir.path().join("app.log.2024061510");
        let after = temp_dir.path().join("app.log.2024061511");
        assert_eq!(fs::read_to_string(before).unwrap(), "before\n");
        assert_eq!(fs::read_to_string(&after).unwrap(), "after\n");
        assert_eq!(cache.current_path(), Some(after.as_path()));
    }

    #[test]
    fn test_never_rotation_uses_base_path() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("plain.log");
        let mut cache = FileHandleCache::new(base.clone(), Rotation::Never);

        cache
            .write_all(&at("2024-06-15T10:00:00+00:00[UTC]"), b"a\n")
            .unwrap();
        cache
            .write_all(&at("2024-06-16T10:00:00+00:00[UTC]"), b"b\n")
            .unwrap();
        assert_eq!(fs::read_to_string(&base).unwrap(), "a\nb\n");

        cache.set_rotation(Rotation::Daily);
        cache
            .write_all(&at("2024-06-16T10:00:00+00:00[UTC]"), b"c\n")
            .unwrap();
        let rotated = temp_dir.path().join("plain.log.20240616");
        assert_eq!(fs::read_to_string(rotated).unwrap(), "c\n");
    }

    #[test]
    fn test_failed_open_keeps_previous_handle() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app.log");
        let mut cache = FileHandleCache::new(base, Rotation::Daily);

        cache
            .write_all(&at("2024-06-15T10:00:00+00:00[UTC]"), b"ok\n")
            .unwrap();
        let kept = cache.current_path().unwrap().to_path_buf();

        // a directory squatting on the next day's path makes the open fail
        fs::create_dir(temp_dir.path().join("app.log.20240616")).unwrap();
        let err = cache
            .write_all(&at("2024-06-16T10:00:00+00:00[UTC]"), b"lost\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DestinationOpen);
        assert_eq!(cache.current_path(), Some(kept.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_opened_write_only_in_append_mode() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("mode.log");
        fs::write(&path, b"existing\n").unwrap();

        let mut file = open_file(&path).unwrap();
        file.write_all(b"appended\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nappended\n");

        let mut buf = String::new();
        assert!(std::io::Read::read_to_string(&mut file, &mut buf).is_err());
    }
}
