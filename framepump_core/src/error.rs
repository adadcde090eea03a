// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced by the scheduler and its lifecycle owner.

use thiserror::Error;

/// Errors from [`FrameScheduler`](crate::scheduler::FrameScheduler) and
/// [`SchedulerHost`](crate::host::SchedulerHost).
///
/// Apart from [`TimerStart`](Self::TimerStart) these are programming errors:
/// the caller broke the lifecycle or threading contract and the operation was
/// refused without touching scheduler state.
#[derive(Debug, Error)]
pub enum Error {
    /// The host has not been initialized yet.
    #[error("frame scheduler used before initialization")]
    NotInitialized,

    /// The scheduler (or its host) has been disposed.
    #[error("frame scheduler used after dispose")]
    Disposed,

    /// A main-context-only operation was called from another thread.
    #[error("`{operation}` must be called on the main context")]
    NotOnMainContext {
        /// The refused operation.
        operation: &'static str,
    },

    /// The native frame source delivered a notification the scheduler does
    /// not understand.
    #[error("unexpected frame source event: {kind}")]
    UnexpectedFrameSourceEvent {
        /// Short description of the offending notification.
        kind: &'static str,
    },

    /// The fallback timer could not be started.
    #[error("failed to start fallback timer: {0}")]
    TimerStart(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
