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

//! Logspool is a buffered, self-rotating file logger.
//!
//! # Overview
//!
//! Callers write leveled lines to a [`Destination`], addressed by file path through a
//! [`Registry`]. Lines are kept in memory and a background [`Scheduler`] flushes every
//! destination once per tick, so callers never wait on the disk. The physical file follows the
//! calendar: with [`Rotation::Daily`] a destination for `app.log` writes to
//! `app.log.20240615`, then `app.log.20240616`, and so on.
//!
//! Errors raised by background flushes have nobody to return to; they are reported to a
//! [`Trap`] and the failed batch is dropped.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use logspool::Level;
//! use logspool::Logger;
//! use logspool::Registry;
//! use logspool::Scheduler;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let registry = Arc::new(Registry::new());
//! let scheduler = Scheduler::new(registry.clone());
//! scheduler.start().unwrap();
//!
//! let app = registry.get_or_create(dir.path().join("app.log"));
//! app.set_level(Level::Info);
//! app.info("service started").unwrap();
//! app.debug("not persisted").unwrap();
//!
//! // stop the ticker and flush whatever is still buffered
//! scheduler.stop().unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod bridge;
mod clock;
mod destination;
mod error;
mod files;
mod level;
mod logger;
mod options;
mod registry;
mod rotation;
mod scheduler;
pub mod trap;

pub use self::bridge::LogBridge;
pub use self::destination::Destination;
pub use self::destination::FlushTicket;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::level::Level;
pub use self::logger::Logger;
pub use self::options::Options;
pub use self::registry::Registry;
pub use self::rotation::Rotation;
pub use self::scheduler::Scheduler;
pub use self::scheduler::SchedulerBuilder;
pub use self::trap::DefaultTrap;
pub use self::trap::Trap;
