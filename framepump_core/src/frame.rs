// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame payload handed to every callback group.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::time::HostTime;

/// Identifies one subscription session: the span between a subscribe and the
/// matching unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(pub u64);

/// The frame currently being dispatched.
///
/// One `FrameEvent` exists per subscription session and is updated in place
/// on every tick; a new one is created on the first tick after each
/// resubscription. Handlers only ever see it by reference for the duration of
/// one tick. Copy out [`timestamp`](Self::timestamp) to keep history.
#[derive(Debug)]
pub struct FrameEvent {
    session: SessionId,
    timestamp: AtomicU64,
    frame_index: AtomicU64,
}

impl FrameEvent {
    // Only the main context writes; Relaxed is enough for the readers that
    // run on the same thread inside the tick.
    pub(crate) fn new(session: SessionId, timestamp: HostTime) -> Self {
        Self {
            session,
            timestamp: AtomicU64::new(timestamp.ticks()),
            frame_index: AtomicU64::new(0),
        }
    }

    pub(crate) fn advance(&self, timestamp: HostTime) {
        self.timestamp.store(timestamp.ticks(), Ordering::Relaxed);
        self.frame_index.fetch_add(1, Ordering::Relaxed);
    }

    /// Timestamp of the frame being dispatched.
    #[must_use]
    pub fn timestamp(&self) -> HostTime {
        HostTime(self.timestamp.load(Ordering::Relaxed))
    }

    /// Zero-based index of this frame within its session.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index.load(Ordering::Relaxed)
    }

    /// The subscription session this payload belongs to.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }
}
