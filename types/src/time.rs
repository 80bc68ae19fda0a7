//! Simulated delays.
//!
//! Delays are whole milliseconds. They are realised as real wall-clock
//! suspension by the propagation engine, not on a virtual clock.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A non-negative delay in milliseconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Delay(u64);

impl Delay {
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl From<Delay> for Duration {
    fn from(delay: Delay) -> Self {
        delay.as_duration()
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// An inclusive range of delays sampled uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: Delay,
    pub max: Delay,
}

impl DelayRange {
    pub fn new(min: Delay, max: Delay) -> Self {
        Self { min, max }
    }

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Delay::from_millis(min), Delay::from_millis(max))
    }

    /// A range that always yields `delay`.
    pub fn fixed(delay: Delay) -> Self {
        Self::new(delay, delay)
    }

    /// Bounds in ascending order; a reversed range is treated as its mirror.
    pub fn bounds(&self) -> (Delay, Delay) {
        if self.min > self.max {
            (self.max, self.min)
        } else {
            (self.min, self.max)
        }
    }

    /// Draw a delay uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Delay {
        let (lo, hi) = self.bounds();
        Delay(rng.gen_range(lo.0..=hi.0))
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::fixed(Delay::ZERO)
    }
}

impl fmt::Display for DelayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lo, hi) = self.bounds();
        write!(f, "{}..={}ms", lo.0, hi.0)
    }
}
