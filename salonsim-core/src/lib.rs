//! Core discrete event simulation engine for the salon model.
//!
//! This crate provides the building blocks of a process-oriented discrete event
//! simulation: virtual time, a deterministic event queue, resumable processes,
//! FIFO-fair resource pools, a seeded random stream and a metrics aggregator.
//!
//! # Architecture Overview
//!
//! [`Simulation`] owns everything a run needs. Processes implement [`Process`]
//! as explicit state machines: the simulation resumes them with a [`Wakeup`]
//! and they answer with the [`Step`] at which they suspend.
//!
//! # Basic Usage
//!
//! ```rust
//! use salonsim_core::client::{ClientGenerator, ServiceCatalog};
//! use salonsim_core::dists::{ConstantServiceTime, ScriptedArrivals};
//! use salonsim_core::{SimTime, Simulation};
//!
//! let mut simulation = Simulation::new(10);
//! let servers = simulation.add_resource("servers", 1).unwrap();
//! let catalog = ServiceCatalog::new()
//!     .with_category("cut", ConstantServiceTime::new(SimTime::from_whole_minutes(10)));
//! let arrivals = ScriptedArrivals::at([SimTime::zero(), SimTime::from_whole_minutes(5)]).unwrap();
//! simulation
//!     .spawn(Box::new(ClientGenerator::new(2, arrivals, servers, catalog).unwrap()))
//!     .unwrap();
//!
//! let metrics = simulation.run().unwrap();
//! assert_eq!(metrics.average_wait().unwrap(), 2.5);
//! assert_eq!(metrics.final_clock(), SimTime::from_whole_minutes(20));
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], virtual minutes unrelated to wall-clock time.
//! Events at the same instant run in the order they were scheduled, so a run is
//! fully determined by its seed and setup.

pub mod client;
pub mod dists;
pub mod error;
pub mod execute;
pub mod logging;
pub mod metrics;
pub mod process;
pub mod randomness;
pub mod report;
pub mod resource;
pub mod scheduler;
pub mod time;
pub mod types;

use tracing::{debug, instrument, trace};

pub use error::{EventError, SimError, StatsError};
pub use execute::{Execute, Executor};
pub use logging::{
    init_detailed_simulation_logging, init_simulation_logging, init_simulation_logging_with_level,
    process_span, simulation_span,
};
pub use metrics::{ClientRecord, SimulationMetrics, SummaryStatistics};
pub use process::{Context, Process, ProcessState, ProcessTable, Step, Suspension, Wakeup};
pub use randomness::RandomStream;
pub use report::{RecordingReporter, Reporter, SimEvent, TracingReporter};
pub use resource::{Acquire, ResourcePool, ResourceTable, WaitRequest};
pub use scheduler::{Clock, ClockRef, EventEntry, EventQueue};
pub use time::SimTime;
pub use types::{ClientId, EventId, ProcessId, ResourceId};

/// Simulation struct that puts the different parts of a run together.
///
/// See the [crate-level documentation](index.html) for an example.
pub struct Simulation {
    clock: Clock,
    queue: EventQueue,
    processes: ProcessTable,
    resources: ResourceTable,
    rng: RandomStream,
    metrics: SimulationMetrics,
    reporter: Box<dyn Reporter>,
    events_processed: u64,
    last_event_time: SimTime,
}

impl Simulation {
    /// Creates an empty simulation whose random stream is seeded with `seed`.
    /// Events are reported through a [`TracingReporter`].
    pub fn new(seed: u64) -> Self {
        let clock = Clock::default();
        let queue = EventQueue::new(clock.reference());
        Self {
            clock,
            queue,
            processes: ProcessTable::new(),
            resources: ResourceTable::default(),
            rng: RandomStream::new(seed),
            metrics: SimulationMetrics::new(0),
            reporter: Box::new(TracingReporter),
            events_processed: 0,
            last_event_time: SimTime::zero(),
        }
    }

    /// Replaces the reporter that receives [`SimEvent`]s.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Registers a pool of `capacity` interchangeable servers.
    pub fn add_resource(&mut self, name: impl Into<String>, capacity: usize) -> Result<ResourceId, SimError> {
        let name = name.into();
        let id = self.resources.add(name.clone(), capacity)?;
        self.metrics.add_capacity(capacity);
        debug!(resource = %id, name = %name, capacity, "Added resource pool");
        Ok(id)
    }

    /// Adds a process; it is started at the current time.
    pub fn spawn(&mut self, process: Box<dyn Process>) -> Result<ProcessId, SimError> {
        let name = process.name().to_owned();
        let id = self.processes.insert(process);
        self.queue.schedule_now(id, Wakeup::Start)?;
        debug!(process = %id, name = %name, time = %self.time(), "Process spawned");
        Ok(id)
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.time()
    }

    /// Returns a `ClockRef` for reading the simulation time.
    pub fn clock(&self) -> ClockRef {
        self.clock.reference()
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// The run's random stream, for setup draws made before the run starts.
    pub fn rng_mut(&mut self) -> &mut RandomStream {
        &mut self.rng
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn resource(&self, id: ResourceId) -> Result<&ResourcePool, SimError> {
        self.resources.get(id)
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Returns the time of the next scheduled event, or None if no events are scheduled.
    pub fn peek_next_event_time(&self) -> Option<SimTime> {
        self.queue.peek_time()
    }

    /// Performs one step of the simulation. Returns `Ok(true)` if an event was
    /// processed and `Ok(false)` if the queue was empty, which signifies that
    /// the simulation ended.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let event = match self.queue.pop_next() {
            Ok(event) => event,
            Err(EventError::EmptyQueue) => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        self.clock.advance_to(event.time())?;
        self.last_event_time = event.time();
        self.events_processed += 1;
        logging::events::event_dispatched(event.id(), event.time(), event.process(), self.queue.len());

        self.resume_process(event.process(), event.wakeup())?;

        if let Err(err) = self.resources.check_invariants() {
            logging::diagnostics::simulation_inconsistency("resource pool check failed", &err);
            return Err(err);
        }
        Ok(true)
    }

    /// Runs until no events remain and returns the final metrics.
    pub fn run(&mut self) -> Result<&SimulationMetrics, SimError> {
        self.execute(Executor::unbound())?;
        Ok(&self.metrics)
    }

    /// Runs the simulation under the given executor's stopping condition, then
    /// fixes the metrics' final clock to the last processed event time.
    ///
    /// See [`Execute`] and [`Executor`] for more details.
    #[instrument(skip(self, executor), fields(seed = self.rng.seed(), initial_time = %self.time()))]
    pub fn execute<E: Execute>(&mut self, executor: E) -> Result<(), SimError> {
        logging::events::simulation_started(self.time(), self.queue.len(), self.processes.live());
        executor.execute(self)?;
        self.metrics.set_final_clock(self.last_event_time);
        logging::events::simulation_completed(
            self.last_event_time,
            self.events_processed,
            self.metrics.clients_completed(),
        );
        Ok(())
    }

    /// Resumes `id` and applies the steps it returns until it suspends or ends.
    fn resume_process(&mut self, id: ProcessId, wakeup: Wakeup) -> Result<(), SimError> {
        let mut body = self.processes.take_body(id)?;
        let now = self.clock.time();
        let _span = logging::process_span(body.name(), id, now).entered();
        self.processes.set_state(id, ProcessState::Ready)?;

        let mut wakeup = wakeup;
        loop {
            let step = {
                let mut ctx = Context {
                    process: id,
                    now,
                    queue: &mut self.queue,
                    processes: &mut self.processes,
                    resources: &mut self.resources,
                    rng: &mut self.rng,
                    reporter: &mut *self.reporter,
                };
                body.resume(wakeup, &mut ctx)?
            };
            trace!(process = %id, ?step, "Process suspended");

            match step {
                Step::Timeout(duration) => {
                    let until = now + duration;
                    self.queue.schedule(until, id, Wakeup::TimeoutElapsed)?;
                    self.processes
                        .set_state(id, ProcessState::Waiting(Suspension::AwaitingTimeout { until }))?;
                    break;
                }
                Step::Request(resource) => match self.resources.get_mut(resource)?.acquire(id)? {
                    Acquire::Granted => {
                        self.processes.record_grant(id, resource)?;
                        wakeup = Wakeup::Granted(resource);
                    }
                    Acquire::Pending => {
                        self.processes
                            .set_state(id, ProcessState::Waiting(Suspension::AwaitingGrant { resource }))?;
                        break;
                    }
                },
                Step::Done => return self.terminate(id, body),
            }
        }

        self.processes.restore_body(id, body)
    }

    fn terminate(&mut self, id: ProcessId, mut body: Box<dyn Process>) -> Result<(), SimError> {
        let held = self.processes.held(id).to_vec();
        for resource in held {
            resource::release(id, resource, &mut self.resources, &mut self.processes, &mut self.queue)?;
        }
        self.processes.set_state(id, ProcessState::Terminated)?;
        body.on_terminate(&mut self.metrics);
        self.processes.remove(id)?;
        debug!(process = %id, name = %body.name(), time = %self.time(), "Process terminated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(m: u32) -> SimTime {
        SimTime::from_whole_minutes(m)
    }

    /// Takes a seat, holds it for `hold`, then finishes without releasing it.
    struct Grabber {
        pool: ResourceId,
        hold: SimTime,
    }

    impl Process for Grabber {
        fn name(&self) -> &str {
            "grabber"
        }

        fn resume(&mut self, wakeup: Wakeup, _ctx: &mut Context<'_>) -> Result<Step, SimError> {
            match wakeup {
                Wakeup::Start => Ok(Step::Request(self.pool)),
                Wakeup::Granted(_) => Ok(Step::Timeout(self.hold)),
                Wakeup::TimeoutElapsed => Ok(Step::Done),
            }
        }
    }

    /// Takes two seats in a row, then finishes holding both.
    struct Hoarder {
        pool: ResourceId,
        grants: usize,
    }

    impl Process for Hoarder {
        fn name(&self) -> &str {
            "hoarder"
        }

        fn resume(&mut self, wakeup: Wakeup, _ctx: &mut Context<'_>) -> Result<Step, SimError> {
            match wakeup {
                Wakeup::Start => Ok(Step::Request(self.pool)),
                Wakeup::Granted(_) => {
                    self.grants += 1;
                    if self.grants < 2 {
                        Ok(Step::Request(self.pool))
                    } else {
                        Ok(Step::Timeout(minutes(1)))
                    }
                }
                Wakeup::TimeoutElapsed => Ok(Step::Done),
            }
        }
    }

    /// Gives its seat back through the context before finishing.
    struct ExplicitReleaser {
        pool: ResourceId,
    }

    impl Process for ExplicitReleaser {
        fn name(&self) -> &str {
            "releaser"
        }

        fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Step, SimError> {
            match wakeup {
                Wakeup::Start => Ok(Step::Request(self.pool)),
                Wakeup::Granted(_) => Ok(Step::Timeout(minutes(4))),
                Wakeup::TimeoutElapsed => {
                    ctx.release(self.pool)?;
                    ctx.release(self.pool)?;
                    Ok(Step::Done)
                }
            }
        }
    }

    /// Rejects every wakeup.
    struct Stubborn;

    impl Process for Stubborn {
        fn name(&self) -> &str {
            "stubborn"
        }

        fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Step, SimError> {
            Err(SimError::UnexpectedWakeup {
                process: ctx.process_id(),
                name: self.name().to_string(),
                wakeup,
            })
        }
    }

    #[test]
    fn test_empty_simulation_steps_to_completion() {
        let mut sim = Simulation::new(1);
        assert!(!sim.step().unwrap());
        let metrics = sim.run().unwrap();
        assert_eq!(metrics.clients_completed(), 0);
        assert!(metrics.average_wait().is_err());
    }

    #[test]
    fn test_step_advances_clock_to_event_time() {
        let mut sim = Simulation::new(1);
        let pool = sim.add_resource("servers", 1).unwrap();
        sim.spawn(Box::new(Grabber { pool, hold: minutes(7) })).unwrap();

        // Start: synchronous grant, then suspends on its timeout.
        assert!(sim.step().unwrap());
        assert_eq!(sim.time(), SimTime::zero());
        assert_eq!(sim.resource(pool).unwrap().in_use(), 1);
        assert_eq!(sim.peek_next_event_time(), Some(minutes(7)));

        assert!(sim.step().unwrap());
        assert_eq!(sim.time(), minutes(7));
        assert_eq!(sim.resource(pool).unwrap().in_use(), 0);
        assert_eq!(sim.processes().live(), 0);
        assert!(!sim.step().unwrap());
        assert_eq!(sim.events_processed(), 2);
    }

    #[test]
    fn test_termination_hands_seat_to_waiter() {
        let mut sim = Simulation::new(1);
        let pool = sim.add_resource("servers", 1).unwrap();
        let first = sim.spawn(Box::new(Grabber { pool, hold: minutes(5) })).unwrap();
        let second = sim.spawn(Box::new(Grabber { pool, hold: minutes(5) })).unwrap();

        sim.step().unwrap();
        sim.step().unwrap();
        assert_eq!(
            sim.processes().state(second),
            Some(ProcessState::Waiting(Suspension::AwaitingGrant { resource: pool }))
        );
        assert_eq!(sim.resource(pool).unwrap().queue_depth(), 1);

        // First finishes at 5; its seat goes to second without becoming free.
        sim.step().unwrap();
        assert_eq!(sim.processes().state(first), Some(ProcessState::Terminated));
        assert_eq!(sim.resource(pool).unwrap().in_use(), 1);
        assert_eq!(sim.processes().held(second), &[pool]);

        sim.run().unwrap();
        assert_eq!(sim.time(), minutes(10));
        assert_eq!(sim.metrics().final_clock(), minutes(10));
    }

    #[test]
    fn test_termination_releases_every_seat() {
        let mut sim = Simulation::new(1);
        let pool = sim.add_resource("servers", 2).unwrap();
        let hoarder = sim.spawn(Box::new(Hoarder { pool, grants: 0 })).unwrap();

        sim.step().unwrap();
        assert_eq!(sim.processes().held(hoarder), &[pool, pool]);
        assert_eq!(sim.resource(pool).unwrap().in_use(), 2);

        sim.run().unwrap();
        assert_eq!(sim.resource(pool).unwrap().in_use(), 0);
        assert_eq!(sim.resource(pool).unwrap().total_grants(), 2);
    }

    #[test]
    fn test_double_release_is_rejected() {
        let mut sim = Simulation::new(1);
        let pool = sim.add_resource("servers", 1).unwrap();
        sim.spawn(Box::new(ExplicitReleaser { pool })).unwrap();
        let err = sim.run().unwrap_err();
        assert!(matches!(err, SimError::ReleaseWithoutGrant { resource, .. } if resource == pool));
        assert_eq!(sim.time(), minutes(4));
    }

    #[test]
    fn test_unexpected_wakeup_aborts_run() {
        let mut sim = Simulation::new(1);
        let id = sim.spawn(Box::new(Stubborn)).unwrap();
        let err = sim.run().unwrap_err();
        assert!(matches!(
            err,
            SimError::UnexpectedWakeup { process, wakeup: Wakeup::Start, .. } if process == id
        ));
    }

    #[test]
    fn test_invalid_resource_capacity() {
        let mut sim = Simulation::new(1);
        assert!(matches!(
            sim.add_resource("servers", 0),
            Err(SimError::InvalidCapacity { capacity: 0 })
        ));
        assert!(matches!(
            sim.resource(ResourceId(3)),
            Err(SimError::UnknownResource(ResourceId(3)))
        ));
    }
}
