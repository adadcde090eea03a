// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A native frame source the host drives by hand.
//!
//! [`ManualFrameSource`] suits hosts whose event loop already knows when a
//! frame is due (a windowing toolkit's redraw event, a compositor frame
//! callback forwarded from elsewhere). The host calls
//! [`fire`](ManualFrameSource::fire) on the main context with the frame's
//! render time; while the scheduler is subscribed that becomes a tick.
//!
//! Availability is a switch: hosts turn it off when their surface goes away
//! so the next subscription falls back to the timer.

use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use framepump_core::Result;
use framepump_core::source::{FrameSink, FrameSource, FrameSourceEvent};
use framepump_core::time::HostTime;
use parking_lot::Mutex;

/// [`FrameSource`] whose frames come from [`fire`](Self::fire).
#[derive(Debug)]
pub struct ManualFrameSource {
    available: AtomicBool,
    sink: Mutex<Option<FrameSink>>,
    attach_count: AtomicUsize,
    delivered: AtomicU64,
}

impl Default for ManualFrameSource {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ManualFrameSource {
    /// Creates a source that reports `available` when probed.
    #[must_use]
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            sink: Mutex::new(None),
            attach_count: AtomicUsize::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// Changes what the next subscription sees. Does not affect a scheduler
    /// that is already attached.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Whether a scheduler is currently attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// How many times a scheduler has attached over this source's lifetime.
    #[must_use]
    pub fn attach_count(&self) -> usize {
        self.attach_count.load(Ordering::Acquire)
    }

    /// Frames delivered to an attached scheduler so far.
    #[must_use]
    pub fn frames_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    /// Reports a frame rendering at `render_time`. Call on the main context.
    ///
    /// Returns `Ok(false)` when nothing is attached, in which case the frame
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Propagates the attached scheduler's delivery error.
    pub fn fire(&self, render_time: HostTime) -> Result<bool> {
        // Clone out so the sink runs handlers without our lock held.
        let Some(sink) = self.sink.lock().clone() else {
            return Ok(false);
        };
        sink.deliver(FrameSourceEvent::Rendering { render_time })?;
        self.delivered.fetch_add(1, Ordering::AcqRel);
        Ok(true)
    }
}

impl FrameSource for ManualFrameSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn attach(&self, sink: FrameSink) {
        self.attach_count.fetch_add(1, Ordering::AcqRel);
        if self.sink.lock().replace(sink).is_some() {
            log::warn!("ManualFrameSource re-attached without detach; old sink dropped");
        }
    }

    fn detach(&self) {
        self.sink.lock().take();
    }
}
