//! Observable facts emitted by client processes.
//!
//! Processes hand [`SimEvent`]s to the run's [`Reporter`] through
//! [`Context::report`](crate::process::Context::report). The default
//! [`TracingReporter`] turns them into `info!` records; [`RecordingReporter`]
//! keeps them in memory, which is how runs are compared for determinism.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tracing::info;

use crate::types::ClientId;
use crate::SimTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    ClientArrived {
        client: ClientId,
        time: SimTime,
    },
    ServiceStarted {
        client: ClientId,
        time: SimTime,
        wait: SimTime,
    },
    ServiceCompleted {
        client: ClientId,
        time: SimTime,
        category: String,
        duration: SimTime,
    },
}

impl SimEvent {
    pub fn client(&self) -> ClientId {
        match self {
            SimEvent::ClientArrived { client, .. }
            | SimEvent::ServiceStarted { client, .. }
            | SimEvent::ServiceCompleted { client, .. } => *client,
        }
    }

    pub fn time(&self) -> SimTime {
        match self {
            SimEvent::ClientArrived { time, .. }
            | SimEvent::ServiceStarted { time, .. }
            | SimEvent::ServiceCompleted { time, .. } => *time,
        }
    }
}

/// Sink for [`SimEvent`]s.
pub trait Reporter {
    fn on_event(&mut self, event: &SimEvent);
}

/// Logs every event at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn on_event(&mut self, event: &SimEvent) {
        match event {
            SimEvent::ClientArrived { client, time } => {
                info!(%client, %time, "Client arrived");
            }
            SimEvent::ServiceStarted { client, time, wait } => {
                info!(%client, %time, %wait, "Service started");
            }
            SimEvent::ServiceCompleted {
                client,
                time,
                category,
                duration,
            } => {
                info!(%client, %time, category = %category, %duration, "Service completed");
            }
        }
    }
}

/// Collects events in emission order.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to the simulation.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    events: Rc<RefCell<Vec<SimEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<SimEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl Reporter for RecordingReporter {
    fn on_event(&mut self, event: &SimEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
