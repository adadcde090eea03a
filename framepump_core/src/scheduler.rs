// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame scheduler: subscription state machine and tick dispatch.
//!
//! [`FrameScheduler`] keeps a set of registered keys, one per subsystem that
//! currently wants frames. While the set is non-empty the scheduler is
//! attached to exactly one pump (see [`crate::source`]); once it has stayed
//! empty for [`SchedulerConfig::idle_frame_threshold`] frames the scheduler
//! detaches and costs nothing until the next activation.
//!
//! # State machine
//!
//! ```text
//!                 activate (set non-empty)
//!   Unsubscribed ─────────────────────────► SubscribePending
//!        ▲                                         │ subscribe job runs
//!        │ idle threshold reached / dispose        ▼ on the main context
//!        └─────────────────────────────────── Subscribed
//! ```
//!
//! `activate_callback` and `deactivate_callback` may be called from any
//! thread. Everything else (subscribe, unsubscribe, ticks, dispose) runs on
//! the [`MainContext`].
//!
//! # Frame dispatch
//!
//! Each tick updates the session's [`FrameEvent`], then runs the four
//! [`CallbackGroup`]s in [`CallbackGroup::DISPATCH_ORDER`] against a snapshot
//! of the registries. A handler that panics is logged and skipped; the rest
//! of its group and the later groups still run, and idle bookkeeping always
//! happens.

use core::fmt;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::callbacks::{CallbackGroup, Callbacks, HandlerId};
use crate::config::SchedulerConfig;
use crate::context::MainContext;
use crate::error::{Error, Result};
use crate::frame::{FrameEvent, SessionId};
use crate::source::{
    FallbackTimer, FrameSink, FrameSource, FrameSourceEvent, PumpKind, TimerHandle,
};
use crate::time::{Clock, HostTime};
use crate::trace::{
    FrameTickEvent, GroupBeginEvent, GroupEndEvent, SubscriptionEvent, TraceSink, Tracer,
    UnsubscribeReason,
};

/// Where the scheduler is in its subscription lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// No pump attached and none requested.
    Unsubscribed,
    /// A subscribe job has been posted to the main context but has not run.
    SubscribePending,
    /// Attached to a pump; frames are being delivered.
    Subscribed,
}

/// The injected collaborators a scheduler runs against.
#[derive(Clone)]
pub struct Collaborators {
    /// The context all transitions and dispatch run on.
    pub main: Arc<dyn MainContext>,
    /// The host's native frame signal, probed on every subscribe.
    pub source: Arc<dyn FrameSource>,
    /// Timer used when `source` is unavailable.
    pub timer: Arc<dyn FallbackTimer>,
    /// Timestamps for fallback-timer frames.
    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Per-frame callback scheduler bound to one frame source.
///
/// This is a cheap, cloneable handle; clones share the same scheduler. Pass
/// clones to the subsystems that need to activate frames or register
/// handlers. [`dispose`](Self::dispose) ends the scheduler for every clone.
///
/// ```rust,ignore
/// let scheduler = FrameScheduler::new(collaborators, SchedulerConfig::default())?;
/// scheduler.on_animation_tick(|frame| animations.advance(frame.timestamp()))?;
///
/// // From any thread:
/// scheduler.activate_callback("animations")?;
/// // ... frames flow until the key is deactivated and the idle window passes.
/// scheduler.deactivate_callback("animations")?;
/// ```
#[derive(Clone)]
pub struct FrameScheduler {
    shared: Arc<Shared>,
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.shared.registry.lock();
        f.debug_struct("FrameScheduler")
            .field("state", &registry.state)
            .field("keys", &registry.keys.len())
            .field("idle_frames", &registry.idle_frames)
            .field("session", &registry.session)
            .field("disposed", &registry.disposed)
            .field("callbacks", &self.shared.callbacks)
            .finish_non_exhaustive()
    }
}

impl FrameScheduler {
    /// Creates a scheduler. It starts [`Unsubscribed`](SubscriptionState::Unsubscribed).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOnMainContext`] when called off the main context.
    pub fn new(collaborators: Collaborators, config: SchedulerConfig) -> Result<Self> {
        if !collaborators.main.is_current() {
            return Err(Error::NotOnMainContext {
                operation: "initialize",
            });
        }
        log::debug!(
            "frame scheduler created (idle threshold {} frames, fallback period {:?})",
            config.idle_frame_threshold,
            config.fallback_period
        );
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                collaborators,
                registry: Mutex::new(Registry {
                    keys: HashSet::new(),
                    state: SubscriptionState::Unsubscribed,
                    idle_frames: 0,
                    disposed: false,
                    session: SessionId(0),
                }),
                pump: Mutex::new(PumpSlot::default()),
                callbacks: Callbacks::default(),
                tracer: Tracer::default(),
            }),
        })
    }

    /// Registers `key` as wanting frames. Callable from any thread.
    ///
    /// When this leaves the key set non-empty while nothing is subscribed or
    /// pending, a subscribe job is posted to the main context at
    /// [`SchedulerConfig::subscribe_priority`]. The pending flag is set under
    /// the same lock as the insertion, so concurrent callers post at most one
    /// job. Returns `true` if `key` was not already registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after [`dispose`](Self::dispose).
    pub fn activate_callback(&self, key: impl Into<String>) -> Result<bool> {
        let key = key.into();
        let inserted = {
            let mut registry = self.shared.registry.lock();
            if registry.disposed {
                return Err(Error::Disposed);
            }
            let inserted = registry.keys.insert(key);
            if registry.state != SubscriptionState::Unsubscribed {
                return Ok(inserted);
            }
            registry.state = SubscriptionState::SubscribePending;
            inserted
        };

        let shared = Arc::clone(&self.shared);
        self.shared.collaborators.main.post(
            self.shared.config.subscribe_priority,
            Box::new(move || shared.subscribe()),
        );
        Ok(inserted)
    }

    /// Withdraws `key`. Callable from any thread.
    ///
    /// Never unsubscribes directly: the pump keeps running until the idle
    /// window elapses, so an in-flight frame completes and quick
    /// deactivate/activate churn does not thrash the subscription. Returns
    /// `true` if `key` was registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after [`dispose`](Self::dispose).
    pub fn deactivate_callback(&self, key: &str) -> Result<bool> {
        let mut registry = self.shared.registry.lock();
        if registry.disposed {
            return Err(Error::Disposed);
        }
        Ok(registry.keys.remove(key))
    }

    /// Adds a handler to the UI-commit group, the first to run each frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after [`dispose`](Self::dispose).
    pub fn on_ui_commit<F>(&self, handler: F) -> Result<HandlerId>
    where
        F: Fn(&FrameEvent) + Send + Sync + 'static,
    {
        self.add_handler(CallbackGroup::UiCommit, handler)
    }

    /// Adds a handler to the animation group, run after UI commit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after [`dispose`](Self::dispose).
    pub fn on_animation_tick<F>(&self, handler: F) -> Result<HandlerId>
    where
        F: Fn(&FrameEvent) + Send + Sync + 'static,
    {
        self.add_handler(CallbackGroup::AnimationTick, handler)
    }

    /// Adds a handler to the script-event group, run after animation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after [`dispose`](Self::dispose).
    pub fn on_script_event<F>(&self, handler: F) -> Result<HandlerId>
    where
        F: Fn(&FrameEvent) + Send + Sync + 'static,
    {
        self.add_handler(CallbackGroup::ScriptEvent, handler)
    }

    /// Adds a handler to the idle group, the last to run each frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after [`dispose`](Self::dispose).
    pub fn on_idle<F>(&self, handler: F) -> Result<HandlerId>
    where
        F: Fn(&FrameEvent) + Send + Sync + 'static,
    {
        self.add_handler(CallbackGroup::Idle, handler)
    }

    /// Adds a handler to `group`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] after [`dispose`](Self::dispose).
    pub fn add_handler<F>(&self, group: CallbackGroup, handler: F) -> Result<HandlerId>
    where
        F: Fn(&FrameEvent) + Send + Sync + 'static,
    {
        self.ensure_live()?;
        Ok(self.shared.callbacks.add(group, Arc::new(handler)))
    }

    /// Detaches a handler. Returns `false` if it was already gone. A handler
    /// removed during a tick still runs for that tick.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.shared.callbacks.remove(id)
    }

    /// Number of handlers registered in `group`.
    #[must_use]
    pub fn handler_count(&self, group: CallbackGroup) -> usize {
        self.shared.callbacks.len(group)
    }

    /// Installs a trace sink, replacing any previous one. Without the `trace`
    /// feature the sink is dropped.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink + Send>) {
        self.shared.tracer.install(sink);
    }

    /// Shuts the scheduler down: unsubscribes if needed, marks it disposed
    /// and drops every registered handler. A subscribe job still queued on
    /// the main context becomes a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOnMainContext`] off the main context and
    /// [`Error::Disposed`] if already disposed.
    pub fn dispose(&self) -> Result<()> {
        if !self.shared.collaborators.main.is_current() {
            return Err(Error::NotOnMainContext {
                operation: "dispose",
            });
        }
        let ended = {
            let mut registry = self.shared.registry.lock();
            if registry.disposed {
                return Err(Error::Disposed);
            }
            registry.disposed = true;
            registry.idle_frames = 0;
            let was = core::mem::replace(&mut registry.state, SubscriptionState::Unsubscribed);
            (was == SubscriptionState::Subscribed).then_some(registry.session)
        };
        if let Some(session) = ended {
            self.shared.release_pump();
            self.shared.report_unsubscribed(session, UnsubscribeReason::Disposed);
        }
        self.shared.callbacks.clear();
        log::debug!("frame scheduler disposed");
        Ok(())
    }

    /// Current subscription state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.shared.registry.lock().state
    }

    /// `true` while a pump is attached.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.state() == SubscriptionState::Subscribed
    }

    /// `true` once [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.registry.lock().disposed
    }

    /// Consecutive idle frames counted in the current session.
    #[must_use]
    pub fn idle_frames(&self) -> u32 {
        self.shared.registry.lock().idle_frames
    }

    /// The currently registered keys, in no particular order.
    #[must_use]
    pub fn registered_keys(&self) -> Vec<String> {
        self.shared.registry.lock().keys.iter().cloned().collect()
    }

    /// The most recent session. Zero before the first subscribe.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.shared.registry.lock().session
    }

    /// The pump driving the current session, if any.
    #[must_use]
    pub fn active_pump(&self) -> Option<PumpKind> {
        self.shared.pump.lock().active.as_ref().map(ActivePump::kind)
    }

    /// The tuning this scheduler was created with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    fn ensure_live(&self) -> Result<()> {
        if self.shared.registry.lock().disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Cross-thread bookkeeping. Lock order: `registry` before `pump`; neither is
/// held while handlers run.
struct Shared {
    config: SchedulerConfig,
    collaborators: Collaborators,
    registry: Mutex<Registry>,
    pump: Mutex<PumpSlot>,
    callbacks: Callbacks,
    tracer: Tracer,
}

struct Registry {
    keys: HashSet<String>,
    state: SubscriptionState,
    idle_frames: u32,
    disposed: bool,
    session: SessionId,
}

/// Main-context-only resources of the live session.
#[derive(Default)]
struct PumpSlot {
    active: Option<ActivePump>,
    session: SessionId,
    payload: Option<Arc<FrameEvent>>,
    /// Set while `tick` dispatches; a frame arriving then is dropped.
    in_tick: bool,
}

/// Clears `PumpSlot::in_tick` when a tick ends, however it ends.
struct TickGuard<'a>(&'a Mutex<PumpSlot>);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().in_tick = false;
    }
}

enum ActivePump {
    Native,
    Timer(Box<dyn TimerHandle>),
}

impl ActivePump {
    fn kind(&self) -> PumpKind {
        match self {
            Self::Native => PumpKind::NativePump,
            Self::Timer(_) => PumpKind::FallbackTimer,
        }
    }
}

impl Shared {
    /// Runs on the main context, posted by `activate_callback`.
    fn subscribe(self: &Arc<Self>) {
        debug_assert!(
            self.collaborators.main.is_current(),
            "subscribe must run on the main context"
        );
        let session = {
            let mut registry = self.registry.lock();
            if registry.disposed {
                log::debug!("subscribe abandoned: scheduler disposed");
                registry.state = SubscriptionState::Unsubscribed;
                return;
            }
            if registry.state != SubscriptionState::SubscribePending {
                log::warn!("stale subscribe job ignored in state {:?}", registry.state);
                return;
            }
            // Committed only once a pump is running.
            SessionId(registry.session.0 + 1)
        };

        let pump = if self.collaborators.source.is_available() {
            self.collaborators.source.attach(self.native_sink(session));
            Ok(ActivePump::Native)
        } else {
            self.start_fallback_timer(session).map(ActivePump::Timer)
        };

        let pump = match pump {
            Ok(pump) => pump,
            Err(err) => {
                log::error!("frame pump subscribe failed: {err}");
                self.registry.lock().state = SubscriptionState::Unsubscribed;
                return;
            }
        };

        let kind = pump.kind();
        {
            let mut slot = self.pump.lock();
            debug_assert!(slot.active.is_none(), "second pump attached");
            slot.active = Some(pump);
            slot.session = session;
            slot.payload = None;
        }
        {
            let mut registry = self.registry.lock();
            registry.session = session;
            registry.idle_frames = 0;
            registry.state = SubscriptionState::Subscribed;
        }
        log::debug!("subscribed to {kind:?} (session {})", session.0);
        self.tracer
            .subscription(&SubscriptionEvent::Subscribed { session, pump: kind });
    }

    fn native_sink(self: &Arc<Self>, session: SessionId) -> FrameSink {
        let weak = Arc::downgrade(self);
        FrameSink::from_fn(move |event| {
            let render_time = match event {
                FrameSourceEvent::Rendering { render_time } => render_time,
                other @ FrameSourceEvent::Untimed => {
                    log::error!("frame source contract violation: {}", other.kind());
                    return Err(Error::UnexpectedFrameSourceEvent { kind: other.kind() });
                }
            };
            let Some(shared) = weak.upgrade() else {
                return Ok(());
            };
            if shared.is_live_session(session, PumpKind::NativePump) {
                shared.tick(render_time);
            } else {
                log::warn!("frame from detached source dropped (session {})", session.0);
            }
            Ok(())
        })
    }

    fn start_fallback_timer(self: &Arc<Self>, session: SessionId) -> Result<Box<dyn TimerHandle>> {
        let weak = Arc::downgrade(self);
        let main = Arc::clone(&self.collaborators.main);
        let priority = self.config.timer_tick_priority;
        self.collaborators.timer.start(
            self.config.fallback_interval(),
            Box::new(move || {
                let weak: Weak<Self> = weak.clone();
                main.post(
                    priority,
                    Box::new(move || {
                        // Unsubscription may have happened between the fire and
                        // this job running.
                        if let Some(shared) = weak.upgrade()
                            && shared.is_live_session(session, PumpKind::FallbackTimer)
                        {
                            shared.tick(shared.clock_now());
                        }
                    }),
                );
            }),
        )
    }

    /// Clock reading in the configured timebase.
    fn clock_now(&self) -> HostTime {
        let clock = &self.collaborators.clock;
        clock.now().convert(clock.timebase(), self.config.timebase)
    }

    fn is_live_session(&self, session: SessionId, pump: PumpKind) -> bool {
        let live = {
            let registry = self.registry.lock();
            registry.state == SubscriptionState::Subscribed && registry.session == session
        };
        live && self.pump.lock().active.as_ref().map(ActivePump::kind) == Some(pump)
    }

    /// Dispatches one frame. Main context only.
    fn tick(&self, timestamp: HostTime) {
        debug_assert!(
            self.collaborators.main.is_current(),
            "ticks must run on the main context"
        );
        let (payload, pump) = {
            let mut slot = self.pump.lock();
            if slot.in_tick {
                log::warn!("frame at {timestamp:?} arrived during dispatch; dropped");
                return;
            }
            slot.in_tick = true;
            let session = slot.session;
            if let Some(payload) = &slot.payload {
                payload.advance(timestamp);
            }
            let payload = Arc::clone(
                slot.payload
                    .get_or_insert_with(|| Arc::new(FrameEvent::new(session, timestamp))),
            );
            let pump = slot
                .active
                .as_ref()
                .map_or(PumpKind::FallbackTimer, ActivePump::kind);
            (payload, pump)
        };
        let _guard = TickGuard(&self.pump);

        let frame_index = payload.frame_index();
        log::trace!("frame {frame_index} at {timestamp:?}");
        self.tracer.frame_tick(&FrameTickEvent {
            session: payload.session(),
            frame_index,
            timestamp,
            pump,
        });

        let snapshot = self.callbacks.snapshot();
        'groups: for group in CallbackGroup::DISPATCH_ORDER {
            let handlers = snapshot.group(group);
            self.tracer.group_begin(&GroupBeginEvent {
                frame_index,
                group,
                handlers: handlers.len(),
            });
            let mut failures = 0;
            for handler in handlers {
                // A handler may dispose the scheduler; nothing runs after that.
                if self.registry.lock().disposed {
                    log::debug!("dispatch of frame {frame_index} stopped: scheduler disposed");
                    break 'groups;
                }
                if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| handler(&payload))) {
                    failures += 1;
                    let message = panic_message(panic.as_ref());
                    log::error!(
                        "{} handler panicked on frame {frame_index}: {message}",
                        group.name()
                    );
                    self.tracer.subscriber_panic(frame_index, group, message);
                }
            }
            self.tracer.group_end(&GroupEndEvent {
                frame_index,
                group,
                failures,
            });
        }

        self.count_idle_frame();
    }

    fn count_idle_frame(&self) {
        let ended = {
            let mut registry = self.registry.lock();
            // A handler may have disposed the scheduler during dispatch.
            if registry.state != SubscriptionState::Subscribed {
                return;
            }
            if !registry.keys.is_empty() {
                registry.idle_frames = 0;
                return;
            }
            registry.idle_frames += 1;
            if registry.idle_frames < self.config.idle_frame_threshold {
                return;
            }
            let frames = core::mem::take(&mut registry.idle_frames);
            registry.state = SubscriptionState::Unsubscribed;
            (registry.session, frames)
        };
        let (session, frames) = ended;
        self.release_pump();
        self.report_unsubscribed(session, UnsubscribeReason::Idle { frames });
    }

    /// Detaches whichever pump is live and drops the payload. Main context
    /// only; the registry state has already been moved to `Unsubscribed`.
    fn release_pump(&self) {
        let active = {
            let mut slot = self.pump.lock();
            slot.payload = None;
            slot.active.take()
        };
        match active {
            Some(ActivePump::Native) => self.collaborators.source.detach(),
            Some(ActivePump::Timer(mut handle)) => handle.stop(),
            None => {}
        }
    }

    fn report_unsubscribed(&self, session: SessionId, reason: UnsubscribeReason) {
        log::debug!("unsubscribed (session {}): {reason:?}", session.0);
        self.tracer
            .subscription(&SubscriptionEvent::Unsubscribed { session, reason });
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        // Every handle is gone. Timer handles stop on drop; a native source
        // has to be told explicitly.
        if let Some(ActivePump::Native) = self.pump.get_mut().active.take() {
            log::warn!("frame scheduler dropped while subscribed; detaching native source");
            self.collaborators.source.detach();
        }
    }
}

fn panic_message(payload: &(dyn core::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
