//! Resumable processes and the process table
//!
//! A process is an explicit state machine. The simulation resumes it with a
//! [`Wakeup`]; the process runs until it reaches its next suspension point and
//! returns that point as a [`Step`]. Between resumptions it lives in the
//! [`ProcessTable`], keyed by its [`ProcessId`].
//!
//! Two suspension primitives exist:
//!
//! - [`Step::Timeout`] parks the process until `now + duration`; it is resumed
//!   with [`Wakeup::TimeoutElapsed`].
//! - [`Step::Request`] asks for a seat in a resource pool. When a seat is free
//!   the process is resumed synchronously with [`Wakeup::Granted`]; otherwise it
//!   is queued and resumed once a release hands a seat over.
//!
//! Returning [`Step::Done`] terminates the process. Any seats it still holds are
//! released, then [`Process::on_terminate`] receives the metrics aggregator.

use tracing::debug;

use crate::error::SimError;
use crate::metrics::SimulationMetrics;
use crate::randomness::RandomStream;
use crate::report::{Reporter, SimEvent};
use crate::resource::{self, ResourceTable};
use crate::scheduler::EventQueue;
use crate::types::{ProcessId, ResourceId};
use crate::SimTime;

/// Input a process is resumed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// First resumption after being spawned.
    Start,
    /// A timeout requested with [`Step::Timeout`] has elapsed.
    TimeoutElapsed,
    /// A seat in the given resource pool now belongs to the process.
    Granted(ResourceId),
}

/// Suspension point reached by a process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Sleep for the given span of simulation time.
    Timeout(SimTime),
    /// Acquire a seat in the given resource pool.
    Request(ResourceId),
    /// The lifecycle is complete.
    Done,
}

/// Where a waiting process will resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    AwaitingTimeout { until: SimTime },
    AwaitingGrant { resource: ResourceId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Waiting(Suspension),
    Terminated,
}

/// A resumable unit of execution.
pub trait Process {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Runs the process from its last suspension point to the next one.
    fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Step, SimError>;

    /// Called once, after the process returned [`Step::Done`] and its seats
    /// were released.
    fn on_terminate(&mut self, _metrics: &mut SimulationMetrics) {}
}

struct ProcessEntry {
    state: ProcessState,
    /// Pools this process holds a seat in, in acquisition order.
    held: Vec<ResourceId>,
    /// `None` while the process is being resumed.
    body: Option<Box<dyn Process>>,
}

/// Bookkeeping for every live process.
///
/// Ids are indices and are never reused, so an id names the same process for
/// the whole run and ids depend only on spawn order. A terminated process's
/// slot is cleared but stays in the table as `None`; the table grows by one
/// entry per process ever spawned.
#[derive(Default)]
pub struct ProcessTable {
    slots: Vec<Option<ProcessEntry>>,
    live: usize,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new process in the `Ready` state.
    pub fn insert(&mut self, process: Box<dyn Process>) -> ProcessId {
        let id = ProcessId(self.slots.len());
        self.slots.push(Some(ProcessEntry {
            state: ProcessState::Ready,
            held: Vec::new(),
            body: Some(process),
        }));
        self.live += 1;
        id
    }

    /// State of a process. Ids of removed processes report `Terminated`.
    pub fn state(&self, id: ProcessId) -> Option<ProcessState> {
        match self.slots.get(id.0) {
            Some(Some(entry)) => Some(entry.state),
            Some(None) => Some(ProcessState::Terminated),
            None => None,
        }
    }

    /// Pools the process currently holds a seat in.
    pub fn held(&self, id: ProcessId) -> &[ResourceId] {
        match self.slots.get(id.0) {
            Some(Some(entry)) => &entry.held,
            _ => &[],
        }
    }

    /// Number of processes that have not terminated.
    pub fn live(&self) -> usize {
        self.live
    }

    fn entry_mut(&mut self, id: ProcessId) -> Result<&mut ProcessEntry, SimError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SimError::UnknownProcess(id))
    }

    pub(crate) fn set_state(&mut self, id: ProcessId, state: ProcessState) -> Result<(), SimError> {
        self.entry_mut(id)?.state = state;
        Ok(())
    }

    pub(crate) fn take_body(&mut self, id: ProcessId) -> Result<Box<dyn Process>, SimError> {
        self.entry_mut(id)?
            .body
            .take()
            .ok_or(SimError::UnknownProcess(id))
    }

    pub(crate) fn restore_body(&mut self, id: ProcessId, body: Box<dyn Process>) -> Result<(), SimError> {
        self.entry_mut(id)?.body = Some(body);
        Ok(())
    }

    pub(crate) fn record_grant(&mut self, id: ProcessId, resource: ResourceId) -> Result<(), SimError> {
        self.entry_mut(id)?.held.push(resource);
        Ok(())
    }

    /// Forgets one seat in `resource`; `false` if the process held none.
    pub(crate) fn record_release(&mut self, id: ProcessId, resource: ResourceId) -> Result<bool, SimError> {
        let held = &mut self.entry_mut(id)?.held;
        match held.iter().position(|r| *r == resource) {
            Some(pos) => {
                held.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn remove(&mut self, id: ProcessId) -> Result<(), SimError> {
        let slot = self.slots.get_mut(id.0).ok_or(SimError::UnknownProcess(id))?;
        if slot.take().is_none() {
            return Err(SimError::UnknownProcess(id));
        }
        self.live -= 1;
        Ok(())
    }
}

/// What a process may do while it is running, besides suspending.
pub struct Context<'a> {
    pub(crate) process: ProcessId,
    pub(crate) now: SimTime,
    pub(crate) queue: &'a mut EventQueue,
    pub(crate) processes: &'a mut ProcessTable,
    pub(crate) resources: &'a mut ResourceTable,
    pub(crate) rng: &'a mut RandomStream,
    pub(crate) reporter: &'a mut dyn Reporter,
}

impl Context<'_> {
    /// Id of the running process.
    pub fn process_id(&self) -> ProcessId {
        self.process
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The run's random stream.
    pub fn rng(&mut self) -> &mut RandomStream {
        &mut *self.rng
    }

    /// Starts a new process at the current time, after already queued events
    /// for this instant.
    pub fn spawn(&mut self, process: Box<dyn Process>) -> Result<ProcessId, SimError> {
        let name = process.name().to_owned();
        let id = self.processes.insert(process);
        self.queue.schedule(self.now, id, Wakeup::Start)?;
        debug!(parent = %self.process, child = %id, name = %name, time = %self.now, "Process spawned");
        Ok(id)
    }

    /// Gives back a seat in `resource` without suspending.
    pub fn release(&mut self, resource: ResourceId) -> Result<(), SimError> {
        resource::release(
            self.process,
            resource,
            self.resources,
            self.processes,
            self.queue,
        )
    }

    /// Hands a log-worthy fact to the run's reporter.
    pub fn report(&mut self, event: SimEvent) {
        self.reporter.on_event(&event);
    }
}
