// Copyright 2026 the Framepump Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic frame timestamps and the clock collaborator.
//!
//! [`HostTime`] is a point on the host's monotonic clock, expressed in
//! [`Timebase::HUNDRED_NANOS`] ticks (10,000,000 per second) unless a backend
//! says otherwise. [`Duration`] uses the same units. [`Clock`] is the
//! injected time source the scheduler reads when the fallback timer fires.

use core::fmt;

/// A point in time on the host's monotonic clock, in clock ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Builds a host time from milliseconds in the given timebase.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64, timebase: Timebase) -> Self {
        Self(timebase.nanos_to_ticks(millis.saturating_mul(1_000_000)))
    }

    /// Converts this host time to nanoseconds using the given timebase.
    #[inline]
    #[must_use]
    pub const fn to_nanos(self, timebase: Timebase) -> u64 {
        timebase.ticks_to_nanos(self.0)
    }

    /// Re-expresses a time read in timebase `from` as ticks of `to`.
    #[inline]
    #[must_use]
    pub const fn convert(self, from: Timebase, to: Timebase) -> Self {
        if from.numer == to.numer && from.denom == to.denom {
            return self;
        }
        Self(to.nanos_to_ticks(self.to_nanos(from)))
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Rational conversion factor from clock ticks to nanoseconds.
///
/// `nanoseconds = ticks * numer / denom`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ticks-to-nanoseconds ratio.
    pub numer: u32,
    /// Denominator of the ticks-to-nanoseconds ratio.
    pub denom: u32,
}

impl Timebase {
    /// Ticks are nanoseconds.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// 100 ns ticks, 10,000,000 per second. The scheduler's default unit.
    pub const HUNDRED_NANOS: Self = Self {
        numer: 100,
        denom: 1,
    };

    /// Converts a tick count to nanoseconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        (ticks as u128 * self.numer as u128 / self.denom as u128) as u64
    }

    /// Converts nanoseconds to a tick count.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn nanos_to_ticks(self, nanos: u64) -> u64 {
        (nanos as u128 * self.denom as u128 / self.numer as u128) as u64
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

/// A span of clock ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// Converts to a [`core::time::Duration`] using the given timebase.
    #[inline]
    #[must_use]
    pub const fn to_std(self, timebase: Timebase) -> core::time::Duration {
        core::time::Duration::from_nanos(timebase.ticks_to_nanos(self.0))
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

/// A monotonic time source.
///
/// Read on the main context each time the fallback timer fires. The reading
/// is converted from [`timebase`](Self::timebase) into the scheduler's
/// configured timebase, so fallback frames and native frames share units.
/// Backends provide the real implementation; tests usually script one.
pub trait Clock: Send + Sync {
    /// Returns the current host time.
    fn now(&self) -> HostTime;

    /// The timebase of the values returned by [`now`](Self::now).
    fn timebase(&self) -> Timebase {
        Timebase::HUNDRED_NANOS
    }
}
