// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for the frame pump.
//!
//! [`TraceSink`] has one method per event the scheduler emits. All of them
//! default to no-ops, so implement only the ones you care about.
//!
//! The scheduler keeps its sink in an internal tracer. When the `trace`
//! feature is **off**, every tracer method compiles to nothing and installed
//! sinks are dropped immediately. When **on**, each emit takes a short lock
//! and performs one `Option` branch. Sinks run on the main context with that
//! lock held and must not call back into the scheduler. A sink that panics
//! is logged and uninstalled; the frame carries on without it.
//!
//! # Crate features
//!
//! - `trace`: enables the tracer method bodies.

use crate::callbacks::CallbackGroup;
use crate::frame::SessionId;
use crate::source::PumpKind;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted before the callback groups run for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTickEvent {
    /// Session the frame belongs to.
    pub session: SessionId,
    /// Frame index within the session.
    pub frame_index: u64,
    /// Frame timestamp.
    pub timestamp: HostTime,
    /// Which pump delivered the frame.
    pub pump: PumpKind,
}

/// Marks the start of one callback group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupBeginEvent {
    /// Frame index within the session.
    pub frame_index: u64,
    /// The group about to run.
    pub group: CallbackGroup,
    /// Number of handlers in the snapshot for this group.
    pub handlers: usize,
}

/// Marks the end of one callback group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupEndEvent {
    /// Frame index within the session.
    pub frame_index: u64,
    /// The group that finished.
    pub group: CallbackGroup,
    /// Handlers in this group that panicked.
    pub failures: usize,
}

/// Why a subscription ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsubscribeReason {
    /// The key set stayed empty for the configured number of frames.
    Idle {
        /// Consecutive idle frames observed.
        frames: u32,
    },
    /// The scheduler was disposed.
    Disposed,
}

/// Emitted when the scheduler attaches to or detaches from a pump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// A session started on `pump`.
    Subscribed {
        /// The new session.
        session: SessionId,
        /// The pump now driving frames.
        pump: PumpKind,
    },
    /// A session ended.
    Unsubscribed {
        /// The session that ended.
        session: SessionId,
        /// Why it ended.
        reason: UnsubscribeReason,
    },
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the scheduler.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when a frame starts dispatching.
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        _ = e;
    }

    /// Called before a callback group runs.
    fn on_group_begin(&mut self, e: &GroupBeginEvent) {
        _ = e;
    }

    /// Called after a callback group ran.
    fn on_group_end(&mut self, e: &GroupEndEvent) {
        _ = e;
    }

    /// Called when the subscription starts or ends.
    fn on_subscription(&mut self, e: &SubscriptionEvent) {
        _ = e;
    }

    /// Called when a handler panics during dispatch.
    fn on_subscriber_panic(&mut self, frame_index: u64, group: CallbackGroup, message: &str) {
        _ = (frame_index, group, message);
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer
// ---------------------------------------------------------------------------

/// Holder for the scheduler's optional [`TraceSink`].
#[derive(Default)]
pub(crate) struct Tracer {
    #[cfg(feature = "trace")]
    sink: parking_lot::Mutex<Option<Box<dyn TraceSink + Send>>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Installs `sink`, replacing any previous one.
    pub(crate) fn install(&self, sink: Box<dyn TraceSink + Send>) {
        #[cfg(feature = "trace")]
        {
            *self.sink.lock() = Some(sink);
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
        }
    }

    /// Runs `emit` against the installed sink, if any.
    #[cfg(feature = "trace")]
    fn emit(&self, event: &'static str, emit: impl FnOnce(&mut dyn TraceSink)) {
        let mut slot = self.sink.lock();
        let Some(sink) = slot.as_mut() else {
            return;
        };
        let sink: &mut dyn TraceSink = sink.as_mut();
        if std::panic::catch_unwind(core::panic::AssertUnwindSafe(|| emit(sink))).is_err() {
            log::error!("trace sink panicked in {event}; uninstalling it");
            *slot = None;
        }
    }

    #[inline]
    pub(crate) fn frame_tick(&self, e: &FrameTickEvent) {
        #[cfg(feature = "trace")]
        self.emit("on_frame_tick", |s| s.on_frame_tick(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    #[inline]
    pub(crate) fn group_begin(&self, e: &GroupBeginEvent) {
        #[cfg(feature = "trace")]
        self.emit("on_group_begin", |s| s.on_group_begin(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    #[inline]
    pub(crate) fn group_end(&self, e: &GroupEndEvent) {
        #[cfg(feature = "trace")]
        self.emit("on_group_end", |s| s.on_group_end(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    #[inline]
    pub(crate) fn subscription(&self, e: &SubscriptionEvent) {
        #[cfg(feature = "trace")]
        self.emit("on_subscription", |s| s.on_subscription(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    #[inline]
    pub(crate) fn subscriber_panic(&self, frame_index: u64, group: CallbackGroup, message: &str) {
        #[cfg(feature = "trace")]
        self.emit("on_subscriber_panic", |s| {
            s.on_subscriber_panic(frame_index, group, message);
        });
        #[cfg(not(feature = "trace"))]
        {
            _ = (frame_index, group, message);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
