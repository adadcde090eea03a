// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A main context built on a plain thread.
//!
//! [`MainLoop`] is bound to the thread that creates it and runs posted jobs
//! there. [`MainHandle`] is the `Send + Sync` side: it implements
//! [`MainContext`] so a [`FrameScheduler`] and its pacing threads can post
//! work back to the loop from anywhere.
//!
//! Jobs travel through one unbounded `crossbeam-channel`. The loop buffers
//! them into two local queues and always drains [`Priority::High`] before
//! [`Priority::Normal`], so a subscribe posted while timer fires are queued
//! still runs first.
//!
//! [`FrameScheduler`]: framepump_core::scheduler::FrameScheduler

use core::cell::{Cell, RefCell};
use core::fmt;
use core::marker::PhantomData;
use std::collections::VecDeque;
use std::thread::{self, ThreadId};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use framepump_core::context::{Job, MainContext, Priority};

enum Envelope {
    Job(Priority, Job),
    Quit,
}

/// `Send + Sync` handle that posts jobs to a [`MainLoop`].
///
/// Cloning is cheap. Jobs posted after the loop is dropped are discarded
/// with a warning.
#[derive(Clone)]
pub struct MainHandle {
    tx: Sender<Envelope>,
    thread: ThreadId,
}

impl fmt::Debug for MainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainHandle")
            .field("thread", &self.thread)
            .finish_non_exhaustive()
    }
}

impl MainHandle {
    /// Asks the loop to return from [`MainLoop::run`] or
    /// [`MainLoop::run_until`] once the jobs already queued have run.
    pub fn quit(&self) {
        // A closed channel means the loop is gone, which is what quit wants.
        let _ = self.tx.send(Envelope::Quit);
    }
}

impl MainContext for MainHandle {
    fn post(&self, priority: Priority, job: Job) {
        if self.tx.send(Envelope::Job(priority, job)).is_err() {
            log::warn!("main loop dropped; discarding {priority:?} job");
        }
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }
}

/// Runs posted jobs on the thread that created it.
///
/// Not `Send`: the loop's thread is the main context.
pub struct MainLoop {
    rx: Receiver<Envelope>,
    handle: MainHandle,
    high: RefCell<VecDeque<Job>>,
    normal: RefCell<VecDeque<Job>>,
    quit: Cell<bool>,
    _not_send: PhantomData<*const ()>,
}

impl fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop")
            .field("thread", &self.handle.thread)
            .field("high", &self.high.borrow().len())
            .field("normal", &self.normal.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl MainLoop {
    /// Creates a loop bound to the current thread.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rx,
            handle: MainHandle {
                tx,
                thread: thread::current().id(),
            },
            high: RefCell::new(VecDeque::new()),
            normal: RefCell::new(VecDeque::new()),
            quit: Cell::new(false),
            _not_send: PhantomData,
        }
    }

    /// Returns a handle for posting to this loop.
    #[must_use]
    pub fn handle(&self) -> MainHandle {
        self.handle.clone()
    }

    /// Runs every queued job, including jobs those jobs post, and returns
    /// how many ran. Does not block.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            self.drain_channel();
            let Some(job) = self.next_job() else {
                return ran;
            };
            job();
            ran += 1;
        }
    }

    /// Runs jobs as they arrive until `deadline` passes or
    /// [`MainHandle::quit`] is called.
    ///
    /// Returns `false` when the loop stopped because of a quit request.
    pub fn run_until(&self, deadline: Instant) -> bool {
        loop {
            self.run_pending();
            if self.quit.replace(false) {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(envelope) => self.enqueue(envelope),
                Err(RecvTimeoutError::Timeout) => {}
                // The loop owns a sender through its handle.
                Err(RecvTimeoutError::Disconnected) => return true,
            }
        }
    }

    /// Runs jobs until [`MainHandle::quit`] is called.
    pub fn run(&self) {
        loop {
            self.run_pending();
            if self.quit.replace(false) {
                return;
            }
            match self.rx.recv() {
                Ok(envelope) => self.enqueue(envelope),
                Err(_) => return,
            }
        }
    }

    fn drain_channel(&self) {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => self.enqueue(envelope),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return,
            }
        }
    }

    fn enqueue(&self, envelope: Envelope) {
        match envelope {
            Envelope::Job(Priority::High, job) => self.high.borrow_mut().push_back(job),
            Envelope::Job(Priority::Normal, job) => self.normal.borrow_mut().push_back(job),
            Envelope::Quit => self.quit.set(true),
        }
    }

    fn next_job(&self) -> Option<Job> {
        let high = self.high.borrow_mut().pop_front();
        high.or_else(|| self.normal.borrow_mut().pop_front())
    }
}
