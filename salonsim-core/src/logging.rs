//! Structured logging for the simulation
//!
//! # Controlling output
//!
//! `init_simulation_logging()` installs an `info`-level formatter. Use
//! `init_simulation_logging_with_level("debug")` to see grants and spawns, or
//! `"trace"` to see every scheduled and dispatched event.
//! `init_detailed_simulation_logging()` turns everything on with pretty output.
//!
//! `RUST_LOG` always wins over the level passed in:
//!
//! ```bash
//! RUST_LOG=salonsim_core::resource=debug salonsim
//! ```
//!
//! # Log level guidelines
//! - **TRACE**: event scheduling and dispatch, random draws
//! - **DEBUG**: seat grants and hand-overs, spawns, terminations
//! - **INFO**: run start and finish, client arrivals and service
//! - **ERROR**: engine invariant violations
//!
//! Initialisers are idempotent: when a global subscriber is already set, they
//! leave it in place.

use tracing::{error, info, trace, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::types::{EventId, ProcessId};
use crate::SimTime;

/// Initialize logging for the simulation at `info` level
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
///
/// # Example
/// ```rust
/// use salonsim_core::logging::init_simulation_logging_with_level;
///
/// init_simulation_logging_with_level("debug");
/// ```
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{level},salonsim_core={level},salonsim={level}").into());

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Simulation logging initialized at level: {}", level);
    }
}

/// Initialize logging with everything enabled, for debugging a run
pub fn init_detailed_simulation_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "trace".into());

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Detailed simulation logging initialized");
    }
}

/// Create a span for tracking simulation execution
pub fn simulation_span(name: &str, seed: u64) -> Span {
    tracing::info_span!("simulation", name = name, seed = seed)
}

/// Create a span covering one resumption of a process
pub fn process_span(name: &str, process: ProcessId, time: SimTime) -> Span {
    tracing::debug_span!("process", name = name, id = %process, time = %time)
}

/// Logging utilities for common simulation events
pub mod events {
    use super::*;

    pub fn simulation_started(initial_time: SimTime, pending_events: usize, live_processes: usize) {
        info!(
            initial_time = %initial_time,
            pending_events,
            live_processes,
            "Simulation started"
        );
    }

    pub fn simulation_completed(final_time: SimTime, events_processed: u64, clients_completed: u64) {
        info!(
            final_time = %final_time,
            events_processed,
            clients_completed,
            "Simulation completed"
        );
    }

    pub fn event_dispatched(event_id: EventId, time: SimTime, process: ProcessId, pending_events: usize) {
        trace!(
            event_id = %event_id,
            time = %time,
            process = %process,
            pending_events,
            "Processing event"
        );
    }
}

/// Logging utilities for error conditions
pub mod diagnostics {
    use super::*;

    /// Log an engine invariant that no longer holds
    pub fn simulation_inconsistency(description: &str, error: &dyn std::error::Error) {
        error!(description = description, error = %error, "Simulation inconsistency detected");
    }
}
