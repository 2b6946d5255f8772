//! Capacity-bounded resource pools
//!
//! A [`ResourcePool`] is a set of interchangeable servers. Grants happen in
//! strict request order: when no seat is free the request joins a FIFO queue,
//! and every release hands its seat straight to the oldest waiter.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::error::SimError;
use crate::process::{ProcessTable, Wakeup};
use crate::scheduler::EventQueue;
use crate::types::{ProcessId, ResourceId};

/// Outcome of [`ResourcePool::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The seat is taken; the caller continues synchronously.
    Granted,
    /// The caller was queued and will be granted by a later release.
    Pending,
}

/// A queued request for a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitRequest {
    pub process: ProcessId,
    pub arrival_sequence: u64,
}

#[derive(Debug)]
pub struct ResourcePool {
    id: ResourceId,
    name: String,
    capacity: usize,
    in_use: usize,
    waiters: VecDeque<WaitRequest>,
    next_sequence: u64,
    total_grants: u64,
    peak_waiters: usize,
}

impl ResourcePool {
    /// Create a pool with `capacity` seats.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidCapacity` when `capacity` is zero.
    pub fn new(id: ResourceId, name: impl Into<String>, capacity: usize) -> Result<Self, SimError> {
        if capacity == 0 {
            return Err(SimError::InvalidCapacity { capacity });
        }
        Ok(Self {
            id,
            name: name.into(),
            capacity,
            in_use: 0,
            waiters: VecDeque::new(),
            next_sequence: 0,
            total_grants: 0,
            peak_waiters: 0,
        })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn has_capacity(&self) -> bool {
        self.in_use < self.capacity
    }

    /// Number of requests waiting for a seat
    pub fn queue_depth(&self) -> usize {
        self.waiters.len()
    }

    /// Queued requests, oldest first
    pub fn waiters(&self) -> impl Iterator<Item = &WaitRequest> {
        self.waiters.iter()
    }

    /// Seats granted over the pool's lifetime
    pub fn total_grants(&self) -> u64 {
        self.total_grants
    }

    /// Longest the wait queue has been
    pub fn peak_queue_depth(&self) -> usize {
        self.peak_waiters
    }

    pub fn utilization(&self) -> f64 {
        self.in_use as f64 / self.capacity as f64
    }

    /// Take a seat for `process`, or queue it behind earlier requests.
    pub fn acquire(&mut self, process: ProcessId) -> Result<Acquire, SimError> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        // A free seat with waiters queued cannot happen: releases hand seats
        // over before anyone else gets to ask.
        if self.has_capacity() && self.waiters.is_empty() {
            self.grant()?;
            trace!(resource = %self.id, %process, in_use = self.in_use, "Seat granted immediately");
            return Ok(Acquire::Granted);
        }

        self.waiters.push_back(WaitRequest {
            process,
            arrival_sequence: sequence,
        });
        self.peak_waiters = self.peak_waiters.max(self.waiters.len());
        debug!(
            resource = %self.id,
            %process,
            queue_depth = self.waiters.len(),
            "No free seat, request queued"
        );
        Ok(Acquire::Pending)
    }

    /// Give back a seat held by `process`.
    ///
    /// When a request is waiting, the seat goes straight to it and the request
    /// is returned so the caller can resume that process.
    pub fn release(&mut self, process: ProcessId) -> Result<Option<WaitRequest>, SimError> {
        if self.in_use == 0 {
            return Err(SimError::ReleaseWithoutGrant {
                process,
                resource: self.id,
            });
        }
        self.in_use -= 1;

        let next = self.waiters.pop_front();
        if let Some(waiter) = next {
            self.grant()?;
            debug!(
                resource = %self.id,
                from = %process,
                to = %waiter.process,
                arrival_sequence = waiter.arrival_sequence,
                "Seat handed over to oldest waiter"
            );
        } else {
            trace!(resource = %self.id, %process, in_use = self.in_use, "Seat released");
        }
        Ok(next)
    }

    /// Verifies `in_use <= capacity`.
    pub fn check_invariant(&self) -> Result<(), SimError> {
        if self.in_use > self.capacity {
            return Err(SimError::OverAllocation {
                resource: self.id,
                in_use: self.in_use,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn grant(&mut self) -> Result<(), SimError> {
        self.in_use += 1;
        self.total_grants += 1;
        self.check_invariant()
    }
}

/// Pools registered with a simulation, indexed by [`ResourceId`].
#[derive(Debug, Default)]
pub struct ResourceTable {
    pools: Vec<ResourcePool>,
}

impl ResourceTable {
    pub fn add(&mut self, name: impl Into<String>, capacity: usize) -> Result<ResourceId, SimError> {
        let id = ResourceId(self.pools.len());
        self.pools.push(ResourcePool::new(id, name, capacity)?);
        Ok(id)
    }

    pub fn get(&self, id: ResourceId) -> Result<&ResourcePool, SimError> {
        self.pools.get(id.0).ok_or(SimError::UnknownResource(id))
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Result<&mut ResourcePool, SimError> {
        self.pools.get_mut(id.0).ok_or(SimError::UnknownResource(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourcePool> {
        self.pools.iter()
    }

    pub fn check_invariants(&self) -> Result<(), SimError> {
        self.pools.iter().try_for_each(ResourcePool::check_invariant)
    }
}

/// Releases `process`'s seat in `resource` and, if the seat went to a waiter,
/// records the grant and schedules the waiter's resumption at the current time.
pub(crate) fn release(
    process: ProcessId,
    resource: ResourceId,
    resources: &mut ResourceTable,
    processes: &mut ProcessTable,
    queue: &mut EventQueue,
) -> Result<(), SimError> {
    if !processes.record_release(process, resource)? {
        return Err(SimError::ReleaseWithoutGrant { process, resource });
    }
    if let Some(waiter) = resources.get_mut(resource)?.release(process)? {
        processes.record_grant(waiter.process, resource)?;
        queue.schedule_now(waiter.process, Wakeup::Granted(resource))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: usize) -> ResourcePool {
        ResourcePool::new(ResourceId(0), "servers", capacity).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ResourcePool::new(ResourceId(0), "servers", 0).unwrap_err();
        assert!(matches!(err, SimError::InvalidCapacity { capacity: 0 }));
    }

    #[test]
    fn test_grants_until_full_then_queues() {
        let mut pool = pool(2);
        assert_eq!(pool.acquire(ProcessId(1)).unwrap(), Acquire::Granted);
        assert_eq!(pool.acquire(ProcessId(2)).unwrap(), Acquire::Granted);
        assert_eq!(pool.acquire(ProcessId(3)).unwrap(), Acquire::Pending);

        assert_eq!(pool.in_use(), 2);
        assert_eq!(pool.queue_depth(), 1);
        assert!(!pool.has_capacity());
        assert_eq!(pool.utilization(), 1.0);
        pool.check_invariant().unwrap();
    }

    #[test]
    fn test_release_hands_seat_to_oldest_waiter() {
        let mut pool = pool(1);
        pool.acquire(ProcessId(1)).unwrap();
        pool.acquire(ProcessId(2)).unwrap();
        pool.acquire(ProcessId(3)).unwrap();

        let next = pool.release(ProcessId(1)).unwrap().unwrap();
        assert_eq!(next.process, ProcessId(2));
        assert_eq!(next.arrival_sequence, 1);
        // The seat moved without ever becoming free.
        assert_eq!(pool.in_use(), 1);

        let next = pool.release(ProcessId(2)).unwrap().unwrap();
        assert_eq!(next.process, ProcessId(3));

        assert!(pool.release(ProcessId(3)).unwrap().is_none());
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.total_grants(), 3);
        assert_eq!(pool.peak_queue_depth(), 2);
    }

    #[test]
    fn test_waiters_keep_arrival_order() {
        let mut pool = pool(1);
        for p in 0..5 {
            pool.acquire(ProcessId(p)).unwrap();
        }
        let sequences: Vec<u64> = pool.waiters().map(|w| w.arrival_sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_release_without_grant_fails() {
        let mut pool = pool(1);
        let err = pool.release(ProcessId(7)).unwrap_err();
        assert!(matches!(
            err,
            SimError::ReleaseWithoutGrant { process: ProcessId(7), resource: ResourceId(0) }
        ));
    }

    #[test]
    fn test_table_lookup() {
        let mut table = ResourceTable::default();
        let id = table.add("servers", 3).unwrap();
        assert_eq!(table.get(id).unwrap().capacity(), 3);
        assert!(matches!(table.get(ResourceId(9)), Err(SimError::UnknownResource(_))));
        assert!(table.add("broken", 0).is_err());
        table.check_invariants().unwrap();
    }
}
