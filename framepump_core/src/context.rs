// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The designated main execution context.
//!
//! Every state transition and every tick dispatch in
//! [`FrameScheduler`](crate::scheduler::FrameScheduler) happens on one logical
//! thread. The scheduler does not own that thread; hosts hand it a
//! [`MainContext`] that can queue work onto it and tell whether the caller is
//! already on it. `framepump_backend_thread::MainLoop` is the stock
//! implementation.

/// A unit of work queued onto the main context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Queue position for posted work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    /// Ordinary work, run after any queued [`High`](Self::High) jobs.
    #[default]
    Normal,
    /// Run ahead of everything at [`Normal`](Self::Normal) priority.
    High,
}

/// Serializes work onto one logical execution context.
pub trait MainContext: Send + Sync {
    /// Queues `job` to run on the main context. Never runs it inline and never
    /// blocks the caller.
    fn post(&self, priority: Priority, job: Job);

    /// Returns `true` when the calling thread is the main context.
    fn is_current(&self) -> bool;
}
