// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time and timebase conversion.
//!
//! [`HostTime`] represents a point in time as platform-native monotonic ticks
//! (`clock_gettime(CLOCK_MONOTONIC)` nanoseconds on the devices this pipeline
//! targets). [`Timebase`] carries the rational conversion factor from ticks
//! to nanoseconds so a non-nanosecond source can still be used.
//!
//! Sensor fusion and gesture timing work in floating-point seconds, so this
//! module also provides the seconds bridge ([`HostTime::to_seconds`],
//! [`HostTime::from_seconds`]) used for pose timestamps and touch timers.
//! All integer arithmetic uses `u128` intermediates to avoid overflow.

use core::fmt;
use core::ops::{Add, Sub};

/// A point in time expressed as platform-native monotonic ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Converts this host time to nanoseconds using the given timebase.
    ///
    /// Uses `u128` intermediate arithmetic to avoid overflow.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn to_nanos(self, timebase: Timebase) -> u64 {
        let wide = self.0 as u128 * timebase.numer as u128 / timebase.denom as u128;
        wide as u64
    }

    /// Creates a [`HostTime`] from a nanosecond value and timebase.
    ///
    /// This is the inverse of [`to_nanos`](Self::to_nanos).
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn from_nanos(nanos: u64, timebase: Timebase) -> Self {
        let wide = nanos as u128 * timebase.denom as u128 / timebase.numer as u128;
        Self(wide as u64)
    }

    /// Converts this host time to floating-point seconds.
    ///
    /// This is the representation consumed by pose prediction and gesture
    /// timers. An `f64` holds nanosecond timestamps exactly for over a
    /// century of uptime, so the conversion does not lose frame-relevant
    /// precision.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "nanosecond counts stay well inside f64's 53-bit exact range"
    )]
    pub fn to_seconds(self, timebase: Timebase) -> f64 {
        self.to_nanos(timebase) as f64 * 1.0e-9
    }

    /// Creates a [`HostTime`] from floating-point seconds and a timebase.
    ///
    /// Negative inputs clamp to zero.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "negative inputs are clamped before the cast"
    )]
    pub fn from_seconds(seconds: f64, timebase: Timebase) -> Self {
        let nanos = if seconds > 0.0 {
            (seconds * 1.0e9) as u64
        } else {
            0
        };
        Self::from_nanos(nanos, timebase)
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Rational conversion factor from ticks to nanoseconds.
///
/// `nanoseconds = ticks * numer / denom`
///
/// The correct instance for a given platform is provided by the clock source
/// in `gyre_runtime` (the Android monotonic clock is already nanoseconds, so
/// [`Timebase::NANOS`] is the common case).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ticks-to-nanoseconds ratio.
    pub numer: u32,
    /// Denominator of the ticks-to-nanoseconds ratio.
    pub denom: u32,
}

impl Timebase {
    /// A timebase where ticks are already nanoseconds (1:1).
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Creates a new timebase with the given numerator and denominator.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(denom != 0, "timebase denominator must not be zero");
        Self { numer, denom }
    }

    /// Converts a tick count to nanoseconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        let wide = ticks as u128 * self.numer as u128 / self.denom as u128;
        wide as u64
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

/// A duration in platform-native ticks.
///
/// Arithmetic uses the same tick units as [`HostTime`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Converts this duration to floating-point seconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "nanosecond counts stay well inside f64's 53-bit exact range"
    )]
    pub fn to_seconds(self, timebase: Timebase) -> f64 {
        HostTime(self.0).to_nanos(timebase) as f64 * 1.0e-9
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}
