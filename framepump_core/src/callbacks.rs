// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered registries for the four per-frame callback groups.
//!
//! Groups always run in [`CallbackGroup::DISPATCH_ORDER`]. Inside a group,
//! handlers run in registration order, though callers should not rely on
//! that. Dispatch works from a snapshot taken before the first group runs,
//! so handlers added or removed mid-tick take effect next tick.

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::frame::FrameEvent;

/// One of the four ordered categories of per-frame subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackGroup {
    /// Commit pending UI layout and visual tree changes.
    UiCommit,
    /// Advance running animations.
    AnimationTick,
    /// Dispatch queued events to script handlers.
    ScriptEvent,
    /// Opportunistic work that should happen once per frame.
    Idle,
}

impl CallbackGroup {
    /// The fixed order groups are invoked in on every frame.
    pub const DISPATCH_ORDER: [Self; 4] = [
        Self::UiCommit,
        Self::AnimationTick,
        Self::ScriptEvent,
        Self::Idle,
    ];

    /// Position in [`DISPATCH_ORDER`](Self::DISPATCH_ORDER).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::UiCommit => 0,
            Self::AnimationTick => 1,
            Self::ScriptEvent => 2,
            Self::Idle => 3,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UiCommit => "ui-commit",
            Self::AnimationTick => "animation",
            Self::ScriptEvent => "script-event",
            Self::Idle => "idle",
        }
    }
}

/// Returned when a handler is registered; pass it to
/// [`FrameScheduler::remove_handler`](crate::scheduler::FrameScheduler::remove_handler)
/// to detach the handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId {
    group: CallbackGroup,
    serial: u64,
}

impl HandlerId {
    /// The group the handler was registered in.
    #[must_use]
    pub const fn group(self) -> CallbackGroup {
        self.group
    }
}

pub(crate) type Handler = Arc<dyn Fn(&FrameEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Callbacks {
    groups: Mutex<[Vec<(u64, Handler)>; 4]>,
    next_serial: AtomicU64,
}

impl core::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let groups = self.groups.lock();
        f.debug_struct("Callbacks")
            .field("ui_commit", &groups[0].len())
            .field("animation_tick", &groups[1].len())
            .field("script_event", &groups[2].len())
            .field("idle", &groups[3].len())
            .finish_non_exhaustive()
    }
}

impl Callbacks {
    pub(crate) fn add(&self, group: CallbackGroup, handler: Handler) -> HandlerId {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        self.groups.lock()[group.index()].push((serial, handler));
        HandlerId { group, serial }
    }

    pub(crate) fn remove(&self, id: HandlerId) -> bool {
        let mut groups = self.groups.lock();
        let group = &mut groups[id.group.index()];
        let before = group.len();
        group.retain(|(serial, _)| *serial != id.serial);
        group.len() != before
    }

    pub(crate) fn clear(&self) {
        self.groups.lock().iter_mut().for_each(Vec::clear);
    }

    pub(crate) fn len(&self, group: CallbackGroup) -> usize {
        self.groups.lock()[group.index()].len()
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let groups = self.groups.lock();
        Snapshot {
            groups: core::array::from_fn(|i| {
                groups[i].iter().map(|(_, h)| Arc::clone(h)).collect()
            }),
        }
    }
}

/// Handlers captured at the start of a tick.
pub(crate) struct Snapshot {
    groups: [Vec<Handler>; 4],
}

impl Snapshot {
    pub(crate) fn group(&self, group: CallbackGroup) -> &[Handler] {
        &self.groups[group.index()]
    }
}
