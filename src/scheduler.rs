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

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::Error;
use crate::ErrorKind;
use crate::FlushTicket;
use crate::Registry;
use crate::Trap;
use crate::trap::DefaultTrap;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_WORKERS: usize = 4;

/// A builder for configuring a [`Scheduler`].
#[derive(Debug)]
pub struct SchedulerBuilder {
    thread_name: String,
    interval: Duration,
    workers: NonZeroUsize,
    trap: Box<dyn Trap>,
}

impl SchedulerBuilder {
    /// Create a new scheduler builder. Threads are named after `thread_name`.
    pub fn new(thread_name: impl Into<String>) -> SchedulerBuilder {
        let workers = std::thread::available_parallelism()
            .map_or(1, |n| n.get().min(DEFAULT_MAX_WORKERS));
        SchedulerBuilder {
            thread_name: thread_name.into(),
            interval: DEFAULT_INTERVAL,
            workers: NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN),
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the tick interval.
    ///
    /// Default to one second.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the number of threads flushing destinations concurrently.
    pub fn workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the trap receiving background flush errors.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build a stopped scheduler over `registry`.
    pub fn build(self, registry: Arc<Registry>) -> Scheduler {
        let Self {
            thread_name,
            interval,
            workers,
            trap,
        } = self;

        Scheduler {
            registry,
            thread_name,
            interval,
            workers,
            trap: Arc::from(trap),
            running: Mutex::new(None),
        }
    }
}

/// Periodically flushes every destination of a registry in the background.
///
/// Each tick visits all destinations and hands every idle one to a flush worker; a destination
/// whose previous flush is still in flight is skipped. The ticker never waits for a flush.
///
/// Buffered lines are only guaranteed to reach the disk once [`Scheduler::stop`] returns (or the
/// scheduler is dropped), so keep the scheduler alive in the entry point of the program.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use logspool::Logger;
/// use logspool::Registry;
/// use logspool::SchedulerBuilder;
///
/// let dir = tempfile::tempdir().unwrap();
/// let registry = Arc::new(Registry::new());
/// let scheduler = SchedulerBuilder::new("logspool-flush")
///     .interval(Duration::from_millis(100))
///     .build(registry.clone());
/// scheduler.start().unwrap();
///
/// let app = registry.get_or_create(dir.path().join("app.log"));
/// app.info("started").unwrap();
///
/// scheduler.stop().unwrap();
/// assert_eq!(app.buffered(), 0);
/// ```
#[derive(Debug)]
pub struct Scheduler {
    registry: Arc<Registry>,
    thread_name: String,
    interval: Duration,
    workers: NonZeroUsize,
    trap: Arc<dyn Trap>,
    running: Mutex<Option<Running>>,
}

#[derive(Debug)]
struct Running {
    shutdown: Sender<()>,
    ticker: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Create a scheduler over `registry` with the default configuration.
    pub fn new(registry: Arc<Registry>) -> Scheduler {
        SchedulerBuilder::new("logspool-scheduler").build(registry)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Start ticking. Starting a running scheduler does nothing.
    ///
    /// # Errors
    ///
    /// Return an error if a thread cannot be spawned.
    pub fn start(&self) -> Result<(), Error> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let (tasks, receiver) = crossbeam_channel::unbounded::<FlushTicket>();
        let mut workers = Vec::with_capacity(self.workers.get());
        for i in 0..self.workers.get() {
            let receiver = receiver.clone();
            let trap = self.trap.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("{}-worker-{i}", self.thread_name))
                .spawn(move || work(receiver, trap));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    drop(tasks);
                    self.join_all(workers);
                    return Err(spawn_failed(err));
                }
            }
        }

        let (shutdown, shutdown_receiver) = crossbeam_channel::bounded::<()>(0);
        let registry = self.registry.clone();
        let interval = self.interval;
        let spawned = std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || tick(registry, interval, tasks, shutdown_receiver));
        let ticker = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                // the sender moved into the failed closure is gone, so workers exit
                self.join_all(workers);
                return Err(spawn_failed(err));
            }
        };

        *running = Some(Running {
            shutdown,
            ticker,
            workers,
        });
        Ok(())
    }

    /// Stop ticking, wait for in-flight flushes, then flush every destination once more on the
    /// calling thread.
    ///
    /// The final flush runs even if the scheduler was never started.
    ///
    /// # Errors
    ///
    /// Return the error of the final flush, see [`Registry::flush_all`].
    pub fn stop(&self) -> Result<(), Error> {
        let running = self.running.lock().take();
        if let Some(Running {
            shutdown,
            ticker,
            workers,
        }) = running
        {
            // disconnecting the shutdown channel wakes the ticker up
            drop(shutdown);
            if ticker.join().is_err() {
                let err = Error::new(ErrorKind::Unexpected, "scheduler ticker panicked");
                self.trap.trap(&err);
            }
            self.join_all(workers);
        }

        self.registry.flush_all()
    }

    /// Run one tick synchronously on the calling thread.
    ///
    /// Every idle destination is flushed before this returns; errors go to the trap. Return the
    /// number of destinations flushed.
    pub fn run_once(&self) -> usize {
        let mut flushed = 0;
        for destination in self.registry.destinations() {
            if let Some(ticket) = destination.try_begin_flush() {
                flushed += 1;
                if let Err(err) = ticket.run() {
                    self.trap.trap(&err);
                }
            }
        }
        flushed
    }

    fn join_all(&self, workers: Vec<JoinHandle<()>>) {
        for worker in workers {
            if worker.join().is_err() {
                let err = Error::new(ErrorKind::Unexpected, "flush worker panicked");
                self.trap.trap(&err);
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if !self.is_running() {
            return;
        }
        if let Err(err) = self.stop() {
            let err = Error::new(ErrorKind::Unexpected, "failed to flush on scheduler dropped")
                .with_source(err);
            self.trap.trap(&err);
        }
    }
}

fn spawn_failed(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Unexpected, "failed to spawn scheduler thread").with_source(err)
}

fn tick(
    registry: Arc<Registry>,
    interval: Duration,
    tasks: Sender<FlushTicket>,
    shutdown: Receiver<()>,
) {
    let ticker = crossbeam_channel::tick(interval);
    loop {
        let stopped = crossbeam_channel::select! {
            recv(ticker) -> _ => false,
            recv(shutdown) -> _ => true,
        };
        if stopped {
            break;
        }
        dispatch(&registry, &tasks);
    }
}

fn dispatch(registry: &Registry, tasks: &Sender<FlushTicket>) {
    registry.for_each(|destination| {
        if let Some(ticket) = destination.try_begin_flush() {
            // an undelivered ticket releases the destination when dropped
            let _ = tasks.send(ticket);
        }
    });
}

fn work(tasks: Receiver<FlushTicket>, trap: Arc<dyn Trap>) {
    while let Ok(ticket) = tasks.recv() {
        if let Err(err) = ticket.run() {
            trap.trap(&err);
        }
    }
}
