//! Monotonic time as seen by the core.
//!
//! The core never reads a wall clock itself — every operation that needs
//! "now" receives it as an argument, so the protocol state machine stays
//! synchronous and trivially testable. `runtime::Node` is the only place
//! that samples a real clock.

use std::ops::{Add, Sub};
use std::time::Duration;

/// A monotonic instant, opaque to the core beyond subtraction/addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Tick(Duration);

impl Tick {
    pub const ZERO: Tick = Tick(Duration::ZERO);

    pub fn from_duration_since_start(d: Duration) -> Self {
        Tick(d)
    }

    pub fn as_duration(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for Tick {
    type Output = Tick;
    fn add(self, rhs: Duration) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl Sub<Tick> for Tick {
    type Output = Duration;
    fn sub(self, rhs: Tick) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}
