//! Cooperative wall-clock budgets.
//!
//! Stages poll [`Budget::is_exhausted`] between loop iterations and return
//! their partial result when it trips. Nothing is ever interrupted from the
//! outside.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct Budget {
    started: Instant,
    limit: Duration,
}

impl Budget {
    /// Start a budget of `limit` from now.
    pub fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Convenience constructor from fractional seconds.
    pub fn from_secs_f32(secs: f32) -> Self {
        Self::start(Duration::from_secs_f32(secs.max(0.0)))
    }

    #[inline]
    pub fn limit(&self) -> Duration {
        self.limit
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[inline]
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.elapsed() > self.limit
    }

    /// Remaining share of the limit in `[0, 1]`; a zero limit reports `0`.
    pub fn remaining_fraction(&self) -> f32 {
        if self.limit.is_zero() {
            return 0.0;
        }
        (self.remaining().as_secs_f32() / self.limit.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// A nested budget that never outlives this one.
    pub fn child(&self, limit: Duration) -> Budget {
        Budget::start(limit.min(self.remaining()))
    }
}
