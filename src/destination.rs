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

use std::fmt::Write;
use std::mem;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use jiff::Zoned;
use parking_lot::Mutex;

use crate::Error;
use crate::Level;
use crate::Options;
use crate::Rotation;
use crate::clock::Clock;
use crate::files::FileHandleCache;

const BUFFER_INIT_CAPACITY: usize = 1024;
const MAX_FLUSH_ATTEMPTS: usize = 3;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const IDLE: u8 = 0;
const FLUSHING: u8 = 1;

/// A logical log file, identified by its base path.
///
/// Lines written to a destination are either buffered in memory and persisted by the next flush,
/// or written to disk straight away when caching is disabled. The physical file is picked by the
/// rotation policy at the moment of the disk write.
///
/// Destinations are obtained from a [`Registry`](crate::Registry), which hands out one shared
/// instance per path.
#[derive(Debug)]
pub struct Destination {
    path: PathBuf,
    level: AtomicU8,
    timestamp: AtomicBool,
    caching: AtomicBool,
    flush_state: FlushState,
    // lock order: `drain_lock` before `buffer` or `files`; `buffer` and `files` are never held
    // together, so buffered writes never wait on disk I/O
    drain_lock: Mutex<()>,
    buffer: Mutex<Vec<String>>,
    files: Mutex<FileHandleCache>,
    clock: Clock,
}

impl Destination {
    pub(crate) fn new(path: PathBuf, options: Options, clock: Clock) -> Self {
        let files = FileHandleCache::new(path.clone(), options.get_rotation());
        Self {
            path,
            level: AtomicU8::new(options.get_level() as u8),
            timestamp: AtomicBool::new(options.get_timestamp()),
            caching: AtomicBool::new(options.get_caching()),
            flush_state: FlushState::default(),
            drain_lock: Mutex::new(()),
            buffer: Mutex::new(Vec::with_capacity(BUFFER_INIT_CAPACITY)),
            files: Mutex::new(files),
            clock,
        }
    }

    /// The base path this destination was created for.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The minimum level; messages below it are dropped.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Set the minimum level.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Whether a message at `level` would be kept.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// Whether lines get a local timestamp prefix.
    pub fn timestamp(&self) -> bool {
        self.timestamp.load(Ordering::Relaxed)
    }

    /// Set whether lines get a local timestamp prefix.
    pub fn set_timestamp(&self, timestamp: bool) {
        self.timestamp.store(timestamp, Ordering::Relaxed);
    }

    /// Whether lines are buffered until the next flush instead of written directly.
    pub fn caching(&self) -> bool {
        self.caching.load(Ordering::Acquire)
    }

    /// Enable or disable caching.
    ///
    /// Disabling caching drains whatever is buffered, so direct writes that follow land after
    /// it.
    ///
    /// # Errors
    ///
    /// Return the flush error if the drained lines could not be persisted.
    pub fn set_caching(&self, caching: bool) -> Result<(), Error> {
        let was_caching = self.caching.swap(caching, Ordering::AcqRel);
        if was_caching && !caching {
            self.flush()?;
        }
        Ok(())
    }

    /// The rotation policy used to pick the physical file.
    pub fn rotation(&self) -> Rotation {
        self.files.lock().rotation()
    }

    /// Set the rotation policy. It takes effect with the next disk write.
    pub fn set_rotation(&self, rotation: Rotation) {
        self.files.lock().set_rotation(rotation);
    }

    /// Whether a flush of this destination is in flight.
    pub fn is_flushing(&self) -> bool {
        self.flush_state.is_flushing()
    }

    /// Number of lines waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Path of the file currently held open, if any.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.files.lock().current_path().map(Path::to_path_buf)
    }

    /// Write one message at `level`.
    ///
    /// The message is dropped if `level` is below the minimum level. With caching enabled the
    /// formatted line is appended to the in-memory buffer and this never touches the disk;
    /// otherwise the line is written to the rotation-correct file before returning.
    ///
    /// # Errors
    ///
    /// Only direct writes fail, with [`ErrorKind::DestinationOpen`](crate::ErrorKind) or
    /// [`ErrorKind::Write`](crate::ErrorKind).
    pub fn write(&self, message: &str, level: Level) -> Result<(), Error> {
        if !self.enabled(level) {
            return Ok(());
        }

        if self.caching() {
            let line = self.format(&self.clock.now(), message);
            self.buffer.lock().push(line);
            return Ok(());
        }

        self.direct_write(message)
    }

    fn direct_write(&self, message: &str) -> Result<(), Error> {
        let mut files = self.files.lock();
        let now = self.clock.now();
        let line = self.format(&now, message);
        files
            .write_all(&now, line.as_bytes())
            .map_err(|err| err.with_context("destination", self.path.display()))
    }

    fn format(&self, now: &Zoned, message: &str) -> String {
        let mut line = String::with_capacity(message.len() + 21);
        if self.timestamp() {
            let _ = write!(line, "{} ", now.strftime(TIMESTAMP_FORMAT));
        }
        line.push_str(message);
        line.push('\n');
        line
    }

    /// Persist everything buffered so far, blocking until it is on disk.
    ///
    /// This runs even when a background flush is in flight; the two batches still reach the
    /// file in the order they were drained.
    ///
    /// # Errors
    ///
    /// Return the last error once all write attempts are exhausted. The batch is dropped.
    pub fn flush(&self) -> Result<(), Error> {
        let _flushing = self.flush_state.try_enter();
        self.drain()
    }

    /// Atomically move this destination from idle to flushing.
    ///
    /// Return `None` if a flush is already in flight. The destination goes back to idle when
    /// the returned ticket is dropped, whether or not it ran.
    pub fn try_begin_flush(self: &Arc<Self>) -> Option<FlushTicket> {
        self.flush_state.enter().then(|| FlushTicket {
            destination: self.clone(),
        })
    }

    fn drain(&self) -> Result<(), Error> {
        // held until the batch is written so batches reach the disk in drain order
        let _draining = self.drain_lock.lock();
        let batch = {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                return Ok(());
            }
            mem::replace(&mut *buffer, Vec::with_capacity(BUFFER_INIT_CAPACITY))
        };

        let bytes = batch.concat();
        let mut files = self.files.lock();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let now = self.clock.now();
            match files.write_all(&now, bytes.as_bytes()) {
                Ok(()) => return Ok(()),
                Err(_) if attempts < MAX_FLUSH_ATTEMPTS => files.invalidate(),
                Err(err) => {
                    files.invalidate();
                    return Err(err
                        .with_context("destination", self.path.display())
                        .with_context("attempts", attempts)
                        .with_context("dropped_lines", batch.len()));
                }
            }
        }
    }
}

/// The right to flush a destination, won by moving it from idle to flushing.
///
/// See [`Destination::try_begin_flush`].
#[derive(Debug)]
#[must_use = "the destination stays flushing until the ticket is run or dropped"]
pub struct FlushTicket {
    destination: Arc<Destination>,
}

impl FlushTicket {
    pub fn destination(&self) -> &Arc<Destination> {
        &self.destination
    }

    /// Drain the destination's buffer to disk, then release it back to idle.
    pub fn run(self) -> Result<(), Error> {
        self.destination.drain()
    }
}

impl Drop for FlushTicket {
    fn drop(&mut self) {
        self.destination.flush_state.leave();
    }
}

#[derive(Debug, Default)]
struct FlushState(AtomicU8);

impl FlushState {
    fn enter(&self) -> bool {
        self.0
            .compare_exchange(IDLE, FLUSHING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn try_enter(&self) -> Option<Flushing<'_>> {
        self.enter().then_some(Flushing(self))
    }

    fn leave(&self) {
        self.0.store(IDLE, Ordering::Release);
    }

    fn is_flushing(&self) -> bool {
        self.0.load(Ordering::Acquire) == FLUSHING
    }
}

struct Flushing<'a>(&'a FlushState);

impl Drop for Flushing<'_> {
    fn drop(&mut self) {
        self.0.leave();
    }
}
