// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-period fallback timer on a dedicated pacing thread.
//!
//! Each [`ThreadTimer::start`] spawns one thread that sleeps on a stop
//! channel until the next deadline, then calls the fire callback. Deadlines
//! are absolute (`start + n * period`), so the time the callback takes does
//! not push later fires back. If the thread falls more than a period behind
//! (a suspended process, a slow callback) the schedule re-anchors on the
//! current time rather than firing a burst of catch-up ticks.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use framepump_core::Result;
use framepump_core::source::{FallbackTimer, TimerCallback, TimerHandle};

/// Shortest period the pacing thread will honour.
const MIN_PERIOD: Duration = Duration::from_micros(100);

/// [`FallbackTimer`] that paces on its own OS thread.
#[derive(Clone, Debug)]
pub struct ThreadTimer {
    thread_name: String,
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadTimer {
    /// Creates a timer whose pacing threads are named `framepump-timer`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_thread_name("framepump-timer")
    }

    /// Creates a timer whose pacing threads carry `name`.
    #[must_use]
    pub fn with_thread_name(name: impl Into<String>) -> Self {
        Self {
            thread_name: name.into(),
        }
    }
}

impl FallbackTimer for ThreadTimer {
    fn start(&self, period: Duration, on_fire: TimerCallback) -> Result<Box<dyn TimerHandle>> {
        let period = if period < MIN_PERIOD {
            log::warn!("fallback period {period:?} clamped to {MIN_PERIOD:?}");
            MIN_PERIOD
        } else {
            period
        };
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let thread = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || pace(period, &stop_rx, on_fire))?;
        log::debug!("fallback timer started, period {period:?}");
        Ok(Box::new(ThreadTimerHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        }))
    }
}

fn pace(period: Duration, stop: &Receiver<()>, mut on_fire: TimerCallback) {
    let mut deadline = Instant::now() + period;
    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
        on_fire();
        deadline += period;
        let now = Instant::now();
        if deadline < now {
            log::trace!("fallback timer behind by {:?}; re-anchoring", now - deadline);
            deadline = now + period;
        }
    }
}

/// Stops its pacing thread on [`stop`](TimerHandle::stop) or drop.
struct ThreadTimerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TimerHandle for ThreadTimerHandle {
    fn stop(&mut self) {
        // Disconnecting the channel wakes the pacing thread.
        let Some(stop) = self.stop.take() else {
            return;
        };
        drop(stop);
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            // Stopped from inside the fire callback; the loop exits on return.
            return;
        }
        if thread.join().is_err() {
            log::error!("fallback timer thread panicked");
        }
    }
}

impl Drop for ThreadTimerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
