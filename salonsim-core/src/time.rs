//! Simulation time management

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::SimError;

/// Simulation time in virtual minutes
///
/// SimTime is a non-negative, finite number of minutes since the simulation
/// start. The same type is used for instants (event times) and spans (waits,
/// service durations), as the scheduler only ever adds spans to the clock.
///
/// Ordering is total: construction rejects NaN, so `f64::total_cmp` agrees
/// with the usual numeric order on every value that can exist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SimTime(f64);

impl SimTime {
    /// Create a new SimTime at the simulation start (time zero)
    pub const fn zero() -> Self {
        SimTime(0.0)
    }

    /// Create a SimTime from minutes, rejecting negative and non-finite values
    pub fn try_from_minutes(minutes: f64) -> Result<Self, SimError> {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(SimError::InvalidTime(minutes));
        }
        // Normalise -0.0 so equality and hashing-by-bits stay well behaved.
        Ok(SimTime(minutes + 0.0))
    }

    /// Create a SimTime from whole minutes
    pub fn from_whole_minutes(minutes: u32) -> Self {
        SimTime(f64::from(minutes))
    }

    /// Get the raw minute value
    pub const fn as_minutes(&self) -> f64 {
        self.0
    }

    /// Whether this is exactly the simulation start
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    /// Halfway between two times
    pub fn midpoint(self, other: SimTime) -> SimTime {
        SimTime((self.0 + other.0) / 2.0)
    }

    /// Calculate the span since an earlier SimTime, saturating at zero
    pub fn duration_since(&self, earlier: SimTime) -> SimTime {
        SimTime((self.0 - earlier.0).max(0.0))
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add<SimTime> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> Self::Output {
        SimTime(self.0 + rhs.0)
    }
}

impl Sub<SimTime> for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.duration_since(rhs)
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::zero()
    }
}

impl TryFrom<f64> for SimTime {
    type Error = SimError;

    fn try_from(minutes: f64) -> Result<Self, Self::Error> {
        SimTime::try_from_minutes(minutes)
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> Self {
        time.0
    }
}

impl From<u32> for SimTime {
    fn from(minutes: u32) -> Self {
        SimTime::from_whole_minutes(minutes)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}min", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simtime_creation() {
        assert_eq!(SimTime::zero().as_minutes(), 0.0);
        assert_eq!(SimTime::from_whole_minutes(90).as_minutes(), 90.0);
        assert_eq!(SimTime::try_from_minutes(2.5).unwrap().as_minutes(), 2.5);
    }

    #[test]
    fn test_simtime_rejects_invalid_values() {
        assert!(matches!(
            SimTime::try_from_minutes(-1.0),
            Err(SimError::InvalidTime(v)) if v == -1.0
        ));
        assert!(SimTime::try_from_minutes(f64::NAN).is_err());
        assert!(SimTime::try_from_minutes(f64::INFINITY).is_err());
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let t = SimTime::try_from_minutes(-0.0).unwrap();
        assert!(t.is_zero());
        assert_eq!(t, SimTime::zero());
    }

    #[test]
    fn test_simtime_arithmetic() {
        let t1 = SimTime::from_whole_minutes(10);
        let t2 = SimTime::from_whole_minutes(4);

        assert_eq!(t1 + t2, SimTime::from_whole_minutes(14));
        assert_eq!(t1 - t2, SimTime::from_whole_minutes(6));
        // Spans never go negative.
        assert_eq!(t2 - t1, SimTime::zero());
        assert_eq!(t1.midpoint(t2), SimTime::from_whole_minutes(7));
    }

    #[test]
    fn test_simtime_ordering() {
        let t1 = SimTime::from_whole_minutes(5);
        let t2 = SimTime::try_from_minutes(5.000001).unwrap();

        assert!(t1 < t2);
        assert!(t2 > t1);
        assert_eq!(t1.max(t2), t2);
    }

    #[test]
    fn test_display() {
        assert_eq!(SimTime::try_from_minutes(7.256).unwrap().to_string(), "7.26min");
    }
}
