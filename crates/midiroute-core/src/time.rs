//! Host time and clocks.
//!
//! `HostTime` is a nanosecond count on the host's MIDI timeline. A stamp of zero means
//! "deliver now", matching how host MIDI services treat unscheduled packets.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostTime(u64);

impl HostTime {
    pub const ZERO: HostTime = HostTime(0);

    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(nanos))
    }

    /// Zero when `earlier` is later than `self`.
    #[inline]
    pub fn saturating_duration_since(self, earlier: HostTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl From<Duration> for HostTime {
    fn from(duration: Duration) -> Self {
        Self::ZERO.saturating_add(duration)
    }
}

impl std::fmt::Display for HostTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Source of the current host time.
///
/// Implementations must be monotonic: successive calls never go backwards.
pub trait HostClock: Send + Sync {
    fn now(&self) -> HostTime;
}

/// Wall-clock backed timeline, relative to the clock's creation.
///
/// The first reading is offset by one nanosecond so `now()` never returns the
/// "deliver now" sentinel.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for MonotonicClock {
    fn now(&self) -> HostTime {
        HostTime::from_nanos(1).saturating_add(self.origin.elapsed())
    }
}

/// Clock that only moves when told to. Used for offline drivers and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new(start: HostTime) -> Self {
        Self {
            nanos: AtomicU64::new(start.as_nanos()),
        }
    }

    /// Ignored if `time` is earlier than the current reading.
    pub fn set(&self, time: HostTime) {
        self.nanos.fetch_max(time.as_nanos(), Ordering::AcqRel);
    }

    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(nanos))
            });
    }
}

impl HostClock for ManualClock {
    fn now(&self) -> HostTime {
        HostTime::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}
