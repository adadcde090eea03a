// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted collaborators for unit tests.

use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::callbacks::CallbackGroup;
use crate::config::SchedulerConfig;
use crate::context::{Job, MainContext, Priority};
use crate::error::Result;
use crate::scheduler::{Collaborators, FrameScheduler};
use crate::source::{
    FallbackTimer, FrameSink, FrameSource, FrameSourceEvent, TimerCallback, TimerHandle,
};
use crate::time::{Clock, HostTime, Timebase};

/// Queues posted jobs until the test drains them on the creating thread.
pub(crate) struct TestContext {
    main_thread: ThreadId,
    queue: Mutex<Vec<(Priority, Job)>>,
    posted_high: AtomicUsize,
    posted_normal: AtomicUsize,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        Self {
            main_thread: thread::current().id(),
            queue: Mutex::new(Vec::new()),
            posted_high: AtomicUsize::new(0),
            posted_normal: AtomicUsize::new(0),
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub(crate) fn posted_at(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.posted_high.load(Ordering::SeqCst),
            Priority::Normal => self.posted_normal.load(Ordering::SeqCst),
        }
    }

    /// Runs queued jobs, high priority first, until the queue is empty.
    pub(crate) fn run_pending(&self) {
        loop {
            let job = {
                let mut queue = self.queue.lock();
                let next = queue
                    .iter()
                    .position(|(p, _)| *p == Priority::High)
                    .or_else(|| (!queue.is_empty()).then_some(0));
                next.map(|i| queue.remove(i).1)
            };
            match job {
                Some(job) => job(),
                None => break,
            }
        }
    }
}

impl MainContext for TestContext {
    fn post(&self, priority: Priority, job: Job) {
        match priority {
            Priority::High => self.posted_high.fetch_add(1, Ordering::SeqCst),
            Priority::Normal => self.posted_normal.fetch_add(1, Ordering::SeqCst),
        };
        self.queue.lock().push((priority, job));
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.main_thread
    }
}

/// A native source the test fires by hand.
#[derive(Default)]
pub(crate) struct TestSource {
    available: AtomicBool,
    sink: Mutex<Option<FrameSink>>,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
}

impl TestSource {
    pub(crate) fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            ..Self::default()
        }
    }

    pub(crate) fn fire(&self, render_time: HostTime) -> Result<()> {
        self.deliver(FrameSourceEvent::Rendering { render_time })
    }

    pub(crate) fn deliver(&self, event: FrameSourceEvent) -> Result<()> {
        let sink = self.sink.lock().clone();
        match sink {
            Some(sink) => sink.deliver(event),
            None => Ok(()),
        }
    }

    pub(crate) fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub(crate) fn detach_count(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

impl FrameSource for TestSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn attach(&self, sink: FrameSink) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        let previous = self.sink.lock().replace(sink);
        assert!(previous.is_none(), "attached twice without detach");
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        self.sink.lock().take();
    }
}

struct TimerSlot {
    callback: Mutex<TimerCallback>,
    stopped: AtomicBool,
}

struct TestTimerHandle(Arc<TimerSlot>);

impl TimerHandle for TestTimerHandle {
    fn stop(&mut self) {
        self.0.stopped.store(true, Ordering::SeqCst);
    }
}

impl Drop for TestTimerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Records started timers; the test fires the newest one by hand.
#[derive(Default)]
pub(crate) struct TestTimer {
    slots: Mutex<Vec<Arc<TimerSlot>>>,
    periods: Mutex<Vec<core::time::Duration>>,
    fail_next: AtomicBool,
}

impl TestTimer {
    pub(crate) fn fire(&self) {
        let slot = self.slots.lock().last().cloned();
        if let Some(slot) = slot
            && !slot.stopped.load(Ordering::SeqCst)
        {
            let mut callback = slot.callback.lock();
            (callback.as_mut())();
        }
    }

    pub(crate) fn fail_next_start(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub(crate) fn started(&self) -> usize {
        self.slots.lock().len()
    }

    pub(crate) fn last_period(&self) -> Option<core::time::Duration> {
        self.periods.lock().last().copied()
    }

    pub(crate) fn all_stopped(&self) -> bool {
        self.slots
            .lock()
            .iter()
            .all(|slot| slot.stopped.load(Ordering::SeqCst))
    }
}

impl FallbackTimer for TestTimer {
    fn start(
        &self,
        period: core::time::Duration,
        on_fire: TimerCallback,
    ) -> Result<Box<dyn TimerHandle>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(std::io::Error::other("timer refused").into());
        }
        let slot = Arc::new(TimerSlot {
            callback: Mutex::new(on_fire),
            stopped: AtomicBool::new(false),
        });
        self.slots.lock().push(Arc::clone(&slot));
        self.periods.lock().push(period);
        Ok(Box::new(TestTimerHandle(slot)))
    }
}

/// Reads whatever the test set, in 100 ns ticks unless switched to nanoseconds.
#[derive(Default)]
pub(crate) struct TestClock {
    now: AtomicU64,
    nanos: AtomicBool,
}

impl TestClock {
    pub(crate) fn set(&self, now: HostTime) {
        self.now.store(now.ticks(), Ordering::SeqCst);
    }

    pub(crate) fn report_nanos(&self) {
        self.nanos.store(true, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> HostTime {
        HostTime(self.now.load(Ordering::SeqCst))
    }

    fn timebase(&self) -> Timebase {
        if self.nanos.load(Ordering::SeqCst) {
            Timebase::NANOS
        } else {
            Timebase::HUNDRED_NANOS
        }
    }
}

/// A scheduler wired to scripted collaborators on the current thread.
pub(crate) struct Harness {
    pub(crate) context: Arc<TestContext>,
    pub(crate) source: Arc<TestSource>,
    pub(crate) timer: Arc<TestTimer>,
    pub(crate) clock: Arc<TestClock>,
    pub(crate) scheduler: FrameScheduler,
}

impl Harness {
    pub(crate) fn native() -> Self {
        Self::with_config(true, SchedulerConfig::default())
    }

    pub(crate) fn fallback() -> Self {
        Self::with_config(false, SchedulerConfig::default())
    }

    pub(crate) fn with_config(native: bool, config: SchedulerConfig) -> Self {
        let context = Arc::new(TestContext::new());
        let source = Arc::new(TestSource::new(native));
        let timer = Arc::new(TestTimer::default());
        let clock = Arc::new(TestClock::default());
        let collaborators = Collaborators {
            main: context.clone(),
            source: source.clone(),
            timer: timer.clone(),
            clock: clock.clone(),
        };
        let scheduler = FrameScheduler::new(collaborators, config).unwrap();
        Self {
            context,
            source,
            timer,
            clock,
            scheduler,
        }
    }

    pub(crate) fn collaborators(&self) -> Collaborators {
        Collaborators {
            main: self.context.clone(),
            source: self.source.clone(),
            timer: self.timer.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Activates `key` and runs the posted subscribe job.
    pub(crate) fn subscribe(&self, key: &str) {
        self.scheduler.activate_callback(key).unwrap();
        self.context.run_pending();
        assert!(self.scheduler.is_subscribed(), "subscribe job did not attach");
    }
}

/// Shared log of which group ran.
#[derive(Clone, Default)]
pub(crate) struct Order(Arc<Mutex<Vec<CallbackGroup>>>);

impl Order {
    pub(crate) fn push(&self, group: CallbackGroup) {
        self.0.lock().push(group);
    }

    pub(crate) fn clear(&self) {
        self.0.lock().clear();
    }

    pub(crate) fn take(&self) -> Vec<CallbackGroup> {
        core::mem::take(&mut *self.0.lock())
    }
}

/// Formats the events it receives into strings.
#[cfg(feature = "trace")]
#[derive(Clone, Default)]
pub(crate) struct RecordingSink(Arc<Mutex<Vec<String>>>);

#[cfg(feature = "trace")]
impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

#[cfg(feature = "trace")]
impl crate::trace::TraceSink for RecordingSink {
    fn on_frame_tick(&mut self, e: &crate::trace::FrameTickEvent) {
        self.0
            .lock()
            .push(format!("tick {} {:?}", e.frame_index, e.timestamp));
    }

    fn on_subscription(&mut self, e: &crate::trace::SubscriptionEvent) {
        use crate::trace::SubscriptionEvent;
        let line = match e {
            SubscriptionEvent::Subscribed { session, pump } => {
                format!("subscribed {} {pump:?}", session.0)
            }
            SubscriptionEvent::Unsubscribed { session, reason } => {
                format!("unsubscribed {} {reason:?}", session.0)
            }
        };
        self.0.lock().push(line);
    }

    fn on_subscriber_panic(&mut self, _frame_index: u64, group: CallbackGroup, message: &str) {
        self.0
            .lock()
            .push(format!("panic {}: {message}", group.name()));
    }
}
