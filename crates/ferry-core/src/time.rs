//! Simulated time
//!
//! The routing core never reads a wall clock. Every event handler is given
//! the current [`SimTime`] by whoever drives it (the simulator's event queue
//! or a real-time adapter), which keeps the decision logic deterministic.
//! One time unit is one second.

use std::fmt::Display;
use std::ops::{Add, AddAssign};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A simulated instant, measured from the start of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of the run
    pub const ZERO: SimTime = SimTime(Duration::ZERO);

    /// Instant `secs` whole seconds after the start
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Instant `millis` milliseconds after the start
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Instant from fractional seconds; negative or non-finite input clamps to zero
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(Duration::from_secs_f64(secs))
        } else {
            Self::ZERO
        }
    }

    /// Offset from the start of the run
    pub fn since_start(&self) -> Duration {
        self.0
    }

    /// Seconds since the start as a float
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future
    pub fn saturating_since(&self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0.saturating_add(rhs))
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 = self.0.saturating_add(rhs);
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_and_arithmetic() {
        let t = SimTime::from_secs(10);
        assert!(t > SimTime::ZERO);
        assert_eq!(t + Duration::from_secs(5), SimTime::from_secs(15));
        assert_eq!(SimTime::from_secs(15).saturating_since(t), Duration::from_secs(5));
        assert_eq!(t.saturating_since(SimTime::from_secs(15)), Duration::ZERO);
    }

    #[test]
    fn test_from_secs_f64_clamps() {
        assert_eq!(SimTime::from_secs_f64(-1.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(1.5), SimTime::from_millis(1500));
    }

    #[test]
    fn test_display() {
        assert_eq!(SimTime::from_millis(2500).to_string(), "2.500s");
    }
}
