//! Error types for the simulation framework

use crate::process::Wakeup;
use crate::types::{ProcessId, ResourceId};
use crate::SimTime;
use thiserror::Error;

/// Top-level error type for simulation operations
///
/// Every variant is fatal for the run: either the simulation was built from an
/// invalid configuration, or an engine invariant no longer holds.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Time validation error: expected a finite non-negative number of minutes, got {0}")]
    InvalidTime(f64),

    #[error("Clock regression: cannot move from {from} back to {to}")]
    ClockRegression { from: SimTime, to: SimTime },

    #[error("Resource capacity must be positive, got {capacity}")]
    InvalidCapacity { capacity: usize },

    #[error("{resource} over-allocated: {in_use} in use with capacity {capacity}")]
    OverAllocation {
        resource: ResourceId,
        in_use: usize,
        capacity: usize,
    },

    #[error("{process} released {resource} without holding it")]
    ReleaseWithoutGrant {
        process: ProcessId,
        resource: ResourceId,
    },

    #[error("Resource not found: {0}")]
    UnknownResource(ResourceId),

    #[error("Process not found: {0}")]
    UnknownProcess(ProcessId),

    #[error("{process} ({name}) cannot handle wakeup {wakeup:?} in its current phase")]
    UnexpectedWakeup {
        process: ProcessId,
        name: String,
        wakeup: Wakeup,
    },
}

/// Errors related to event scheduling and handling
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EventError {
    #[error("Event scheduling failed: cannot schedule event at {time}, clock is already at {now}")]
    InvalidTime { time: SimTime, now: SimTime },

    #[error("Event queue is empty")]
    EmptyQueue,
}

/// Statistics that cannot be derived from the data collected so far
///
/// Not fatal: callers are expected to report the condition and carry on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("Insufficient data for {statistic}: {reason}")]
    InsufficientData {
        statistic: &'static str,
        reason: &'static str,
    },
}
