//! Salon clients and the process that generates them
//!
//! A [`ClientGenerator`] sleeps for an inter-arrival gap, spawns the next
//! [`Client`], and repeats until it has spawned its target population. Each
//! client requests a seat in the server pool, picks a service from the
//! [`ServiceCatalog`] once seated, sleeps for the service duration, and leaves.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::dists::{ArrivalPattern, ServiceTimeDistribution};
use crate::error::SimError;
use crate::metrics::{ClientRecord, SimulationMetrics};
use crate::process::{Context, Process, Step, Wakeup};
use crate::randomness::RandomStream;
use crate::report::SimEvent;
use crate::types::{ClientId, ResourceId};
use crate::SimTime;

#[derive(Debug)]
struct ServiceCategory {
    name: String,
    duration: Box<dyn ServiceTimeDistribution>,
}

/// Services on offer; one is chosen uniformly at random per client.
#[derive(Debug, Default)]
pub struct ServiceCatalog {
    categories: Vec<ServiceCategory>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service category.
    #[must_use]
    pub fn with_category(
        mut self,
        name: impl Into<String>,
        duration: impl ServiceTimeDistribution + 'static,
    ) -> Self {
        self.add(name, Box::new(duration));
        self
    }

    pub fn add(&mut self, name: impl Into<String>, duration: Box<dyn ServiceTimeDistribution>) {
        self.categories.push(ServiceCategory {
            name: name.into(),
            duration,
        });
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Picks a category, then draws its duration.
    pub fn sample(&mut self, rng: &mut RandomStream) -> Result<(String, SimTime), SimError> {
        let index = rng
            .choose_index(self.categories.len())
            .ok_or_else(|| SimError::Configuration("service catalog is empty".to_string()))?;
        let category = &mut self.categories[index];
        let duration = category.duration.sample(rng)?;
        Ok((category.name.clone(), duration))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ClientPhase {
    Arriving,
    Queued {
        arrived: SimTime,
    },
    InService {
        arrived: SimTime,
        started: SimTime,
        category: String,
    },
    Left,
}

/// One salon visit.
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    name: String,
    pool: ResourceId,
    catalog: Rc<RefCell<ServiceCatalog>>,
    phase: ClientPhase,
    record: Option<ClientRecord>,
}

impl Client {
    pub fn new(id: ClientId, pool: ResourceId, catalog: Rc<RefCell<ServiceCatalog>>) -> Self {
        Self {
            id,
            name: id.to_string(),
            pool,
            catalog,
            phase: ClientPhase::Arriving,
            record: None,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }
}

impl Process for Client {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Step, SimError> {
        let now = ctx.now();
        match (std::mem::replace(&mut self.phase, ClientPhase::Left), wakeup) {
            (ClientPhase::Arriving, Wakeup::Start) => {
                ctx.report(SimEvent::ClientArrived {
                    client: self.id,
                    time: now,
                });
                self.phase = ClientPhase::Queued { arrived: now };
                Ok(Step::Request(self.pool))
            }
            (ClientPhase::Queued { arrived }, Wakeup::Granted(pool)) if pool == self.pool => {
                ctx.report(SimEvent::ServiceStarted {
                    client: self.id,
                    time: now,
                    wait: now - arrived,
                });
                let (category, duration) = self.catalog.borrow_mut().sample(ctx.rng())?;
                debug!(client = %self.id, category = %category, %duration, "Service chosen");
                self.phase = ClientPhase::InService {
                    arrived,
                    started: now,
                    category,
                };
                Ok(Step::Timeout(duration))
            }
            (
                ClientPhase::InService {
                    arrived,
                    started,
                    category,
                },
                Wakeup::TimeoutElapsed,
            ) => {
                ctx.report(SimEvent::ServiceCompleted {
                    client: self.id,
                    time: now,
                    category: category.clone(),
                    duration: now - started,
                });
                self.record = Some(ClientRecord {
                    client: self.id,
                    arrival_time: arrived,
                    service_start_time: started,
                    service_end_time: now,
                    service_category: category,
                });
                Ok(Step::Done)
            }
            (phase, wakeup) => {
                self.phase = phase;
                Err(SimError::UnexpectedWakeup {
                    process: ctx.process_id(),
                    name: self.name.clone(),
                    wakeup,
                })
            }
        }
    }

    fn on_terminate(&mut self, metrics: &mut SimulationMetrics) {
        if let Some(record) = self.record.take() {
            metrics.record(record);
        }
    }
}

/// Spawns `target` clients, numbered from 1, separated by draws from an
/// [`ArrivalPattern`].
#[derive(Debug)]
pub struct ClientGenerator {
    target: usize,
    spawned: usize,
    arrivals: Box<dyn ArrivalPattern>,
    pool: ResourceId,
    catalog: Rc<RefCell<ServiceCatalog>>,
    sleeping: bool,
}

impl ClientGenerator {
    /// Fails with [`SimError::Configuration`] when `catalog` has no categories,
    /// since no client could ever be served.
    pub fn new(
        target: usize,
        arrivals: impl ArrivalPattern + 'static,
        pool: ResourceId,
        catalog: ServiceCatalog,
    ) -> Result<Self, SimError> {
        if catalog.is_empty() {
            return Err(SimError::Configuration("service catalog is empty".to_string()));
        }
        Ok(Self {
            target,
            spawned: 0,
            arrivals: Box::new(arrivals),
            pool,
            catalog: Rc::new(RefCell::new(catalog)),
            sleeping: false,
        })
    }

    fn sleep_or_finish(&mut self, ctx: &mut Context<'_>) -> Result<Step, SimError> {
        if self.spawned >= self.target {
            debug!(spawned = self.spawned, "Client generator finished");
            return Ok(Step::Done);
        }
        let gap = self.arrivals.next_arrival_time(ctx.rng())?;
        self.sleeping = true;
        Ok(Step::Timeout(gap))
    }
}

impl Process for ClientGenerator {
    fn name(&self) -> &str {
        "client-generator"
    }

    fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Step, SimError> {
        match (self.sleeping, wakeup) {
            (false, Wakeup::Start) if self.spawned == 0 => self.sleep_or_finish(ctx),
            (true, Wakeup::TimeoutElapsed) => {
                self.sleeping = false;
                self.spawned += 1;
                let id = ClientId(self.spawned as u64);
                ctx.spawn(Box::new(Client::new(id, self.pool, Rc::clone(&self.catalog))))?;
                self.sleep_or_finish(ctx)
            }
            _ => Err(SimError::UnexpectedWakeup {
                process: ctx.process_id(),
                name: self.name().to_string(),
                wakeup,
            }),
        }
    }
}
