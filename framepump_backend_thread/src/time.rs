// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host monotonic clock reads.
//!
//! On Unix the clock is `CLOCK_MONOTONIC`, read through `rustix`, so values
//! line up with timestamps other processes and compositors report. Elsewhere
//! it is `std::time::Instant` measured from the first read.

use framepump_core::time::{Clock, HostTime, Timebase};

const TICKS_PER_SECOND: u128 = 10_000_000;
const NANOS_PER_TICK: u128 = 100;

/// Returns the backend [`Timebase`]: 100 ns ticks.
#[must_use]
pub const fn timebase() -> Timebase {
    Timebase::HUNDRED_NANOS
}

/// Returns the current monotonic host time in 100 ns ticks.
#[must_use]
pub fn now() -> HostTime {
    imp::now()
}

/// [`Clock`] backed by [`now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> HostTime {
        now()
    }

    fn timebase(&self) -> Timebase {
        timebase()
    }
}

fn ticks_from_parts(seconds: u64, nanos: u64) -> HostTime {
    let nanos = nanos.min(999_999_999);
    let ticks = u128::from(seconds)
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(u128::from(nanos) / NANOS_PER_TICK);
    HostTime(u64::try_from(ticks).unwrap_or(u64::MAX))
}

#[cfg(unix)]
mod imp {
    use framepump_core::time::HostTime;
    use rustix::time::{ClockId, Timespec, clock_gettime};

    pub(super) fn now() -> HostTime {
        from_timespec(clock_gettime(ClockId::Monotonic))
    }

    pub(super) fn from_timespec(timespec: Timespec) -> HostTime {
        let seconds = u64::try_from(timespec.tv_sec).unwrap_or(0);
        let nanos = u64::try_from(timespec.tv_nsec).unwrap_or(0);
        super::ticks_from_parts(seconds, nanos)
    }
}

#[cfg(not(unix))]
mod imp {
    use std::sync::OnceLock;
    use std::time::Instant;

    use framepump_core::time::HostTime;

    static EPOCH: OnceLock<Instant> = OnceLock::new();

    pub(super) fn now() -> HostTime {
        let elapsed = EPOCH.get_or_init(Instant::now).elapsed();
        super::ticks_from_parts(elapsed.as_secs(), u64::from(elapsed.subsec_nanos()))
    }
}
