// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thread backend for framepump.
//!
//! Concrete collaborators for a [`FrameScheduler`] on ordinary OS threads:
//!
//! - [`MainLoop`] / [`MainHandle`]: the main context, a job mailbox bound to
//!   the thread that created it, high priority first.
//! - [`ThreadTimer`]: the fallback timer, one pacing thread per
//!   subscription.
//! - [`MonotonicClock`]: the host clock in 100 ns ticks (`CLOCK_MONOTONIC`
//!   on Unix).
//! - [`ManualFrameSource`]: a native pump the host fires from its own redraw
//!   path.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! use framepump_backend_thread::{MainLoop, MonotonicClock, ThreadTimer};
//! use framepump_core::config::SchedulerConfig;
//! use framepump_core::host::SchedulerHost;
//! use framepump_core::scheduler::Collaborators;
//! use framepump_core::source::NoFrameSource;
//!
//! let main = MainLoop::new();
//! let host = SchedulerHost::new(
//!     Collaborators {
//!         main: Arc::new(main.handle()),
//!         source: Arc::new(NoFrameSource),
//!         timer: Arc::new(ThreadTimer::new()),
//!         clock: Arc::new(MonotonicClock),
//!     },
//!     SchedulerConfig::default(),
//! );
//! let scheduler = host.initialize()?;
//! scheduler.on_animation_tick(|frame| println!("frame {}", frame.frame_index()))?;
//! scheduler.activate_callback("animation")?;
//! main.run_until(Instant::now() + Duration::from_millis(100));
//! host.dispose()?;
//! # Ok::<(), framepump_core::Error>(())
//! ```
//!
//! [`FrameScheduler`]: framepump_core::scheduler::FrameScheduler

mod main_loop;
mod manual;
mod time;
mod timer;

pub use main_loop::{MainHandle, MainLoop};
pub use manual::ManualFrameSource;
pub use time::{MonotonicClock, now, timebase};
pub use timer::ThreadTimer;
