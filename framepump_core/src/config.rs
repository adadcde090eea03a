// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tunables for the [`FrameScheduler`](crate::scheduler::FrameScheduler).

use crate::context::Priority;
use crate::time::{Duration, Timebase};

/// Configuration for the [`FrameScheduler`](crate::scheduler::FrameScheduler).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of consecutive idle frames after which the scheduler drops its
    /// subscription. Must be at least 1.
    pub idle_frame_threshold: u32,
    /// Interval of the fallback timer used when no native frame source is
    /// available, in [`timebase`](Self::timebase) ticks.
    pub fallback_period: Duration,
    /// Units of [`fallback_period`](Self::fallback_period).
    pub timebase: Timebase,
    /// Priority of the subscribe job posted to the main context.
    pub subscribe_priority: Priority,
    /// Priority of the jobs the fallback timer posts for each frame.
    pub timer_tick_priority: Priority,
}

impl SchedulerConfig {
    /// 60 Hz fallback pacing (166,666 ticks of a 10 MHz clock) and a
    /// two-second idle window at that rate.
    #[must_use]
    pub const fn reference() -> Self {
        Self {
            idle_frame_threshold: 120,
            fallback_period: Duration(166_666),
            timebase: Timebase::HUNDRED_NANOS,
            subscribe_priority: Priority::High,
            timer_tick_priority: Priority::Normal,
        }
    }

    /// Replaces the idle window.
    ///
    /// # Panics
    ///
    /// Panics if `frames` is zero.
    #[must_use]
    pub const fn with_idle_frame_threshold(mut self, frames: u32) -> Self {
        assert!(frames > 0, "idle frame threshold must be at least one frame");
        self.idle_frame_threshold = frames;
        self
    }

    /// Replaces the fallback timer period.
    #[must_use]
    pub const fn with_fallback_period(mut self, period: Duration) -> Self {
        self.fallback_period = period;
        self
    }

    /// The fallback period as a [`core::time::Duration`].
    #[must_use]
    pub const fn fallback_interval(&self) -> core::time::Duration {
        self.fallback_period.to_std(self.timebase)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::reference()
    }
}
