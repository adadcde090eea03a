// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-display-frame callback scheduling.
//!
//! `framepump_core` turns a host frame signal into an ordered, once-per-frame
//! dispatch of four callback groups, and only keeps that signal subscribed
//! while some subsystem asks for frames.
//!
//! # Architecture
//!
//! ```text
//!   any thread                          main context
//!   ──────────                          ────────────
//!   activate_callback(key) ──post──►  subscribe ──► FrameSource (native)
//!   deactivate_callback(key)             │      └─► FallbackTimer ──post──┐
//!                                        ▼                                │
//!                                   tick(timestamp) ◄─────────────────────┘
//!                                        │
//!              UiCommit ► AnimationTick ► ScriptEvent ► Idle
//!                                        │
//!                          idle frames ≥ threshold ──► unsubscribe
//! ```
//!
//! **[`scheduler`]** — [`FrameScheduler`](scheduler::FrameScheduler), the
//! subscription state machine and tick dispatch.
//!
//! **[`host`]** — [`SchedulerHost`](host::SchedulerHost), the explicit
//! initialize/dispose owner of one scheduler.
//!
//! **[`callbacks`]** — The four ordered callback groups and their handler
//! registries.
//!
//! **[`frame`]** — [`FrameEvent`](frame::FrameEvent), the per-session payload
//! handlers read.
//!
//! **[`source`]** — Frame delivery: the native [`FrameSource`](source::FrameSource)
//! trait and the [`FallbackTimer`](source::FallbackTimer) used without one.
//!
//! **[`context`]** — The [`MainContext`](context::MainContext) all
//! transitions run on.
//!
//! **[`time`]** — Host timestamps, timebases and the [`Clock`](time::Clock)
//! trait.
//!
//! **[`config`]** — [`SchedulerConfig`](config::SchedulerConfig) presets.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) hooks for frame-pump
//! instrumentation.
//!
//! Concrete collaborators for plain threads live in
//! `framepump_backend_thread`.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables delivery to an installed
//!   [`TraceSink`](trace::TraceSink).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod callbacks;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod host;
pub mod scheduler;
pub mod source;
pub mod time;
pub mod trace;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
