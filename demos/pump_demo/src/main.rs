// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drives a frame scheduler from the fallback timer for a couple of seconds.
//!
//! A worker thread asks for frames, an animation advances for one second,
//! the worker withdraws its request and the scheduler unsubscribes itself
//! once the idle window passes. Lifecycle events go through a
//! [`TraceSink`] that logs them. Run with `RUST_LOG=debug` to also see the
//! scheduler's own logging.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use framepump_backend_thread::{MainLoop, MonotonicClock, ThreadTimer};
use framepump_core::callbacks::CallbackGroup;
use framepump_core::config::SchedulerConfig;
use framepump_core::host::SchedulerHost;
use framepump_core::scheduler::{Collaborators, SubscriptionState};
use framepump_core::source::NoFrameSource;
use framepump_core::trace::{FrameTickEvent, SubscriptionEvent, TraceSink};

const ANIMATION_TIME: Duration = Duration::from_secs(1);
/// Upper bound on waiting for the idle unsubscribe.
const SETTLE_TIME: Duration = Duration::from_secs(5);
/// Degrees the spinner turns per frame.
const SPIN_STEP: u64 = 6;

/// Logs subscription changes and one frame in sixty.
struct LogSink;

impl TraceSink for LogSink {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        if e.frame_index % 60 == 0 {
            log::info!(
                "frame {} of session {} via {:?} at {:?}",
                e.frame_index,
                e.session.0,
                e.pump,
                e.timestamp
            );
        }
    }

    fn on_subscription(&mut self, e: &SubscriptionEvent) {
        match e {
            SubscriptionEvent::Subscribed { session, pump } => {
                log::info!("session {} subscribed via {pump:?}", session.0);
            }
            SubscriptionEvent::Unsubscribed { session, reason } => {
                log::info!("session {} unsubscribed: {reason:?}", session.0);
            }
        }
    }

    fn on_subscriber_panic(&mut self, frame_index: u64, group: CallbackGroup, message: &str) {
        log::warn!("{} handler failed on frame {frame_index}: {message}", group.name());
    }
}

fn init_logging() {
    let mut builder = env_logger::Builder::new();
    match std::env::var("RUST_LOG") {
        Ok(filter) => {
            builder.parse_filters(&filter);
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Info);
        }
    }
    builder.init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let main_loop = MainLoop::new();
    let host = SchedulerHost::new(
        Collaborators {
            main: Arc::new(main_loop.handle()),
            source: Arc::new(NoFrameSource),
            timer: Arc::new(ThreadTimer::new()),
            clock: Arc::new(MonotonicClock),
        },
        SchedulerConfig::reference(),
    );
    let scheduler = host.initialize()?;
    scheduler.set_trace_sink(Box::new(LogSink));

    let angle = Arc::new(AtomicU64::new(0));
    let commits = Arc::new(AtomicU64::new(0));
    let idle_frames = Arc::new(AtomicU64::new(0));
    {
        let commits = Arc::clone(&commits);
        scheduler.on_ui_commit(move |_| {
            commits.fetch_add(1, Ordering::Relaxed);
        })?;
    }
    {
        let angle = Arc::clone(&angle);
        scheduler.on_animation_tick(move |_| {
            angle.fetch_add(SPIN_STEP, Ordering::Relaxed);
        })?;
    }
    {
        let idle_frames = Arc::clone(&idle_frames);
        scheduler.on_idle(move |_| {
            idle_frames.fetch_add(1, Ordering::Relaxed);
        })?;
    }

    let worker = {
        let scheduler = scheduler.clone();
        thread::Builder::new()
            .name("spinner".into())
            .spawn(move || scheduler.activate_callback("spinner"))?
    };
    worker.join().map_err(|_| "spinner thread panicked")??;

    let start = Instant::now();
    main_loop.run_until(start + ANIMATION_TIME);
    log::info!(
        "animated {} frames, spinner at {} degrees",
        commits.load(Ordering::Relaxed),
        angle.load(Ordering::Relaxed) % 360
    );

    scheduler.deactivate_callback("spinner")?;
    let deadline = Instant::now() + SETTLE_TIME;
    while scheduler.state() != SubscriptionState::Unsubscribed && Instant::now() < deadline {
        main_loop.run_until(Instant::now() + Duration::from_millis(50));
    }
    log::info!(
        "state {:?} after {} frames in total ({} idle-group calls)",
        scheduler.state(),
        commits.load(Ordering::Relaxed),
        idle_frames.load(Ordering::Relaxed)
    );

    host.dispose()?;
    Ok(())
}
