// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle owner for one [`FrameScheduler`].
//!
//! [`SchedulerHost`] gives a frame source an explicit `initialize`/`dispose`
//! pair without a process-wide global. Whoever owns the host hands
//! [`FrameScheduler`] clones to the subsystems that need them. One host per
//! frame source; hosts do not coordinate with each other.

use parking_lot::Mutex;

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::scheduler::{Collaborators, FrameScheduler};

#[derive(Debug)]
enum Slot {
    Empty,
    Live(FrameScheduler),
    Disposed,
}

/// Owns the scheduler for one frame source.
#[derive(Debug)]
pub struct SchedulerHost {
    collaborators: Collaborators,
    config: SchedulerConfig,
    slot: Mutex<Slot>,
}

impl SchedulerHost {
    /// Creates a host. No scheduler exists until [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(collaborators: Collaborators, config: SchedulerConfig) -> Self {
        Self {
            collaborators,
            config,
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Creates the scheduler if there is none and returns a handle to it.
    /// Calling it again returns the same scheduler. After
    /// [`dispose`](Self::dispose) a fresh scheduler is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOnMainContext`] off the main context.
    pub fn initialize(&self) -> Result<FrameScheduler> {
        if !self.collaborators.main.is_current() {
            return Err(Error::NotOnMainContext {
                operation: "initialize",
            });
        }
        let mut slot = self.slot.lock();
        if let Slot::Live(scheduler) = &*slot {
            return Ok(scheduler.clone());
        }
        let scheduler = FrameScheduler::new(self.collaborators.clone(), self.config)?;
        *slot = Slot::Live(scheduler.clone());
        Ok(scheduler)
    }

    /// Returns the live scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before the first
    /// [`initialize`](Self::initialize) and [`Error::Disposed`] after
    /// [`dispose`](Self::dispose).
    pub fn scheduler(&self) -> Result<FrameScheduler> {
        match &*self.slot.lock() {
            Slot::Empty => Err(Error::NotInitialized),
            Slot::Live(scheduler) => Ok(scheduler.clone()),
            Slot::Disposed => Err(Error::Disposed),
        }
    }

    /// Disposes the live scheduler (unsubscribing first if needed) and clears
    /// the slot. Outstanding handles report [`Error::Disposed`] from then on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOnMainContext`] off the main context,
    /// [`Error::NotInitialized`] before [`initialize`](Self::initialize) and
    /// [`Error::Disposed`] when already disposed.
    pub fn dispose(&self) -> Result<()> {
        if !self.collaborators.main.is_current() {
            return Err(Error::NotOnMainContext {
                operation: "dispose",
            });
        }
        let scheduler = {
            let mut slot = self.slot.lock();
            match core::mem::replace(&mut *slot, Slot::Disposed) {
                Slot::Live(scheduler) => scheduler,
                Slot::Empty => {
                    *slot = Slot::Empty;
                    return Err(Error::NotInitialized);
                }
                Slot::Disposed => return Err(Error::Disposed),
            }
        };
        scheduler.dispose()
    }
}
