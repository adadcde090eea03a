// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame delivery mechanisms.
//!
//! The scheduler receives frames through one of two pumps, chosen each time
//! it subscribes:
//!
//! - [`PumpKind::NativePump`] — a host [`FrameSource`] (vsync callback,
//!   compositor frame clock, windowing redraw) that reports itself available.
//!   The scheduler attaches a [`FrameSink`] and the source pushes
//!   [`FrameSourceEvent`]s into it on the main context.
//! - [`PumpKind::FallbackTimer`] — a [`FallbackTimer`] firing at a fixed
//!   period on its own thread. Each fire is marshaled onto the main context
//!   and stamped with the injected [`Clock`](crate::time::Clock).
//!
//! Only one pump is ever live for a scheduler.

use core::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::time::HostTime;

/// Which delivery mechanism an active subscription uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PumpKind {
    /// Attached to the host's native [`FrameSource`].
    NativePump,
    /// Driven by a [`FallbackTimer`].
    FallbackTimer,
}

/// A notification pushed by a native [`FrameSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameSourceEvent {
    /// A new frame is about to be rendered.
    Rendering {
        /// Render timestamp reported by the host, in the scheduler's
        /// configured timebase.
        render_time: HostTime,
    },
    /// A frame-ready notification that carries no render timestamp.
    ///
    /// The scheduler rejects these with
    /// [`Error::UnexpectedFrameSourceEvent`](crate::Error::UnexpectedFrameSourceEvent).
    Untimed,
}

impl FrameSourceEvent {
    /// Short name used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rendering { .. } => "rendering",
            Self::Untimed => "untimed frame notification",
        }
    }
}

type DeliverFn = dyn Fn(FrameSourceEvent) -> Result<()> + Send + Sync;

/// Receiving end handed to a [`FrameSource`] on attach.
///
/// Cloning is cheap (Arc bump). A sink outliving its subscription silently
/// drops whatever it is given.
#[derive(Clone)]
pub struct FrameSink {
    deliver: Arc<DeliverFn>,
}

impl fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSink").finish_non_exhaustive()
    }
}

impl FrameSink {
    /// Wraps a delivery function. Adapters and tests use this to observe what
    /// a source pushes.
    pub fn from_fn<F>(deliver: F) -> Self
    where
        F: Fn(FrameSourceEvent) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Pushes `event` to the scheduler. Must be called on the main context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedFrameSourceEvent`](crate::Error::UnexpectedFrameSourceEvent)
    /// if `event` has a shape the scheduler cannot tick from.
    pub fn deliver(&self, event: FrameSourceEvent) -> Result<()> {
        (self.deliver)(event)
    }
}

/// A host frame/vsync signal.
pub trait FrameSource: Send + Sync {
    /// Probed at subscribe time. `false` when the host has no live rendering
    /// surface, in which case the fallback timer is used.
    fn is_available(&self) -> bool;

    /// Starts pushing frames into `sink`. Called on the main context.
    fn attach(&self, sink: FrameSink);

    /// Stops pushing frames and drops the sink. Called on the main context.
    fn detach(&self);
}

/// A [`FrameSource`] that is never available, for hosts without a rendering
/// surface. Every subscription falls back to the timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFrameSource;

impl FrameSource for NoFrameSource {
    fn is_available(&self) -> bool {
        false
    }

    fn attach(&self, sink: FrameSink) {
        log::warn!("attach on NoFrameSource ignored");
        drop(sink);
    }

    fn detach(&self) {}
}

/// Called by a running [`FallbackTimer`] on every fire, from the timer's
/// thread.
pub type TimerCallback = Box<dyn FnMut() + Send + 'static>;

/// Starts periodic timers.
pub trait FallbackTimer: Send + Sync {
    /// Starts a timer that calls `on_fire` every `period` until the returned
    /// handle is stopped or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimerStart`](crate::Error::TimerStart) if the timer
    /// could not be created.
    fn start(
        &self,
        period: core::time::Duration,
        on_fire: TimerCallback,
    ) -> Result<Box<dyn TimerHandle>>;
}

/// A running timer. Dropping the handle must also stop the timer.
pub trait TimerHandle: Send {
    /// Stops the timer. No fire starts after this returns.
    fn stop(&mut self);
}
