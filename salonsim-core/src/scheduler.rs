use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use tracing::trace;

use crate::error::{EventError, SimError};
use crate::process::Wakeup;
use crate::types::{EventId, ProcessId};
use crate::SimTime;

/// Entry type stored in the event queue: the process to resume, the wakeup it
/// is resumed with, and the time when it is supposed to occur.
///
/// The event id is the insertion sequence and breaks ties between entries
/// scheduled for the same instant, oldest first.
#[derive(Debug, Clone)]
pub struct EventEntry {
    id: EventId,
    time: SimTime,
    process: ProcessId,
    wakeup: Wakeup,
}

impl EventEntry {
    pub(crate) fn new(id: EventId, time: SimTime, process: ProcessId, wakeup: Wakeup) -> Self {
        Self {
            id,
            time,
            process,
            wakeup,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn process(&self) -> ProcessId {
        self.process
    }

    pub fn wakeup(&self) -> Wakeup {
        self.wakeup
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the ordering for min-heap behavior in BinaryHeap
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// The simulation clock. Owned by the simulation; everything else reads it
/// through a [`ClockRef`].
#[derive(Debug, Default)]
pub struct Clock {
    now: Rc<Cell<SimTime>>,
}

impl Clock {
    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.now.get()
    }

    /// Moves the clock to `time`, refusing to go backwards.
    pub fn advance_to(&self, time: SimTime) -> Result<(), SimError> {
        let from = self.now.get();
        if time < from {
            return Err(SimError::ClockRegression { from, to: time });
        }
        self.now.set(time);
        Ok(())
    }

    /// Returns a read-only view of this clock.
    pub fn reference(&self) -> ClockRef {
        ClockRef {
            now: Rc::clone(&self.now),
        }
    }
}

/// This struct exposes only immutable access to the simulation clock.
///
/// # Example
///
/// ```
/// # use salonsim_core::scheduler::Clock;
/// let clock = Clock::default();
/// let clock_ref = clock.reference();
/// assert_eq!(clock_ref.time(), clock.time());
/// ```
#[derive(Debug, Clone)]
pub struct ClockRef {
    now: Rc<Cell<SimTime>>,
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.now.get()
    }
}

/// Pending events ordered by `(time, sequence)`.
///
/// The queue reads the clock to reject events in the past but never moves it;
/// advancing time is the simulation loop's job once it consumes a popped entry.
#[derive(Debug)]
pub struct EventQueue {
    next_event_id: u64,
    events: BinaryHeap<EventEntry>,
    clock: ClockRef,
}

impl EventQueue {
    pub fn new(clock: ClockRef) -> Self {
        Self {
            next_event_id: 0,
            events: BinaryHeap::new(),
            clock,
        }
    }

    /// Schedules `wakeup` for `process` at the absolute time `time`.
    pub fn schedule(
        &mut self,
        time: SimTime,
        process: ProcessId,
        wakeup: Wakeup,
    ) -> Result<EventId, EventError> {
        let now = self.clock.time();
        if time < now {
            return Err(EventError::InvalidTime { time, now });
        }
        self.next_event_id += 1;
        let id = EventId(self.next_event_id);
        trace!(event_id = %id, %time, %process, ?wakeup, "Event scheduled");
        self.events.push(EventEntry::new(id, time, process, wakeup));
        Ok(id)
    }

    /// Schedules `wakeup` for `process` at the current time.
    pub fn schedule_now(&mut self, process: ProcessId, wakeup: Wakeup) -> Result<EventId, EventError> {
        self.schedule(self.clock.time(), process, wakeup)
    }

    /// Removes and returns the earliest event.
    pub fn pop_next(&mut self) -> Result<EventEntry, EventError> {
        self.events.pop().ok_or(EventError::EmptyQueue)
    }

    /// Time of the earliest event, if any.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.peek().map(EventEntry::time)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
