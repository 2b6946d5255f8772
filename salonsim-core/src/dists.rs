//! Distribution traits and implementations for arrival patterns and service times
//!
//! Distributions hold only their parameters. Sampling takes the run's
//! [`RandomStream`] explicitly, so every draw comes from the single seeded
//! stream owned by the simulation.

use std::collections::VecDeque;
use std::fmt;

use crate::error::SimError;
use crate::randomness::RandomStream;
use crate::SimTime;

/// Trait for generating arrival patterns
///
/// This trait abstracts over different arrival patterns for client generation
/// (exponential, constant, scripted).
pub trait ArrivalPattern: fmt::Debug {
    /// Get the time until the next arrival
    fn next_arrival_time(&mut self, rng: &mut RandomStream) -> Result<SimTime, SimError>;
}

/// Trait for sampling service times from a distribution
pub trait ServiceTimeDistribution: fmt::Debug {
    /// Sample a service time from the distribution
    fn sample(&mut self, rng: &mut RandomStream) -> Result<SimTime, SimError>;

    /// Mean of the distribution
    fn mean(&self) -> SimTime;
}

// =============================================================================
// Arrival Pattern Implementations
// =============================================================================

/// Poisson arrival process
///
/// Inter-arrival times are exponentially distributed with the given mean.
#[derive(Debug, Clone)]
pub struct ExponentialArrivals {
    mean: f64,
}

impl ExponentialArrivals {
    /// Create a new exponential arrival pattern
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` unless `mean_minutes` is finite and positive.
    pub fn new(mean_minutes: f64) -> Result<Self, SimError> {
        if !(mean_minutes.is_finite() && mean_minutes > 0.0) {
            return Err(SimError::Configuration(format!(
                "mean inter-arrival time must be positive, got {mean_minutes}"
            )));
        }
        Ok(Self { mean: mean_minutes })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }
}

impl ArrivalPattern for ExponentialArrivals {
    fn next_arrival_time(&mut self, rng: &mut RandomStream) -> Result<SimTime, SimError> {
        SimTime::try_from_minutes(rng.exponential(self.mean))
    }
}

/// Arrivals at fixed absolute times
///
/// Yields the gaps between consecutive instants; once the script runs out,
/// further arrivals come immediately.
#[derive(Debug, Clone)]
pub struct ScriptedArrivals {
    gaps: VecDeque<SimTime>,
}

impl ScriptedArrivals {
    /// Build from absolute arrival instants, which must be non-decreasing.
    pub fn at(instants: impl IntoIterator<Item = SimTime>) -> Result<Self, SimError> {
        let mut gaps = VecDeque::new();
        let mut previous = SimTime::zero();
        for instant in instants {
            if instant < previous {
                return Err(SimError::Configuration(format!(
                    "scripted arrivals must be non-decreasing, {instant} comes after {previous}"
                )));
            }
            gaps.push_back(instant - previous);
            previous = instant;
        }
        Ok(Self { gaps })
    }

    /// Arrivals left in the script
    pub fn remaining(&self) -> usize {
        self.gaps.len()
    }
}

impl ArrivalPattern for ScriptedArrivals {
    fn next_arrival_time(&mut self, _rng: &mut RandomStream) -> Result<SimTime, SimError> {
        Ok(self.gaps.pop_front().unwrap_or_default())
    }
}

// =============================================================================
// Service Time Distribution Implementations
// =============================================================================

/// Constant service time distribution
#[derive(Debug, Clone)]
pub struct ConstantServiceTime {
    duration: SimTime,
}

impl ConstantServiceTime {
    pub fn new(duration: SimTime) -> Self {
        Self { duration }
    }
}

impl ServiceTimeDistribution for ConstantServiceTime {
    fn sample(&mut self, _rng: &mut RandomStream) -> Result<SimTime, SimError> {
        Ok(self.duration)
    }

    fn mean(&self) -> SimTime {
        self.duration
    }
}

/// Uniform service time distribution
///
/// Samples service times uniformly from `[min, max)`; `min == max` is allowed
/// and always yields `min`.
#[derive(Debug, Clone)]
pub struct UniformServiceTime {
    min: SimTime,
    max: SimTime,
}

impl UniformServiceTime {
    /// Create a new uniform service time distribution
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` if `min` is zero or greater than `max`.
    pub fn new(min: SimTime, max: SimTime) -> Result<Self, SimError> {
        if min.is_zero() || min > max {
            return Err(SimError::Configuration(format!(
                "service range must satisfy 0 < min <= max, got [{min}, {max}]"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> SimTime {
        self.min
    }

    pub fn max(&self) -> SimTime {
        self.max
    }
}

impl ServiceTimeDistribution for UniformServiceTime {
    fn sample(&mut self, rng: &mut RandomStream) -> Result<SimTime, SimError> {
        SimTime::try_from_minutes(rng.uniform_between(self.min.as_minutes(), self.max.as_minutes()))
    }

    fn mean(&self) -> SimTime {
        self.min.midpoint(self.max)
    }
}

// =============================================================================
// Population
// =============================================================================

/// How many clients a run generates, resolved once before the run starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Population {
    Fixed(usize),
    Poisson { mean: f64 },
}

impl Population {
    pub fn resolve(&self, rng: &mut RandomStream) -> Result<usize, SimError> {
        match *self {
            Population::Fixed(count) => Ok(count),
            Population::Poisson { mean } => Ok(rng.poisson(mean)? as usize),
        }
    }
}
