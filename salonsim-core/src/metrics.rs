//! Metrics collection and reporting for discrete event simulation
//!
//! [`SimulationMetrics`] is the run's aggregator. The simulation owns it and
//! hands it to each terminating process, which records its [`ClientRecord`].
//! Derived statistics are computed on read and never mutate the aggregator.
//!
//! Every completion is also mirrored to the `metrics` crate facade, so an
//! installed recorder (Prometheus, logging, ...) sees the same numbers. With no
//! recorder installed those calls are no-ops.

use hdrhistogram::Histogram as HdrHistogram;
use metrics::{counter, gauge, histogram};
use serde::Serialize;

use crate::error::StatsError;
use crate::types::ClientId;
use crate::SimTime;

/// Wait times are bucketed in hundredths of a minute.
const HISTOGRAM_UNITS_PER_MINUTE: f64 = 100.0;

/// Longest wait the histogram resolves exactly: one year, in hundredths of a minute.
/// Longer waits are clamped to it.
const MAX_TRACKED_WAIT_UNITS: u64 = 365 * 24 * 60 * 100;

/// Timestamps of one client's visit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRecord {
    pub client: ClientId,
    pub arrival_time: SimTime,
    pub service_start_time: SimTime,
    pub service_end_time: SimTime,
    pub service_category: String,
}

impl ClientRecord {
    pub fn wait(&self) -> SimTime {
        self.service_start_time - self.arrival_time
    }

    pub fn service_duration(&self) -> SimTime {
        self.service_end_time - self.service_start_time
    }
}

/// Run-wide accumulator of client waits and service times
#[derive(Debug)]
pub struct SimulationMetrics {
    capacity: usize,
    total_wait_accum: f64,
    total_service_accum: f64,
    clients_completed: u64,
    final_clock: SimTime,
    records: Vec<ClientRecord>,
    wait_histogram: HdrHistogram<u64>,
}

impl SimulationMetrics {
    /// Create an aggregator for a pool of `capacity` servers.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            total_wait_accum: 0.0,
            total_service_accum: 0.0,
            clients_completed: 0,
            final_clock: SimTime::zero(),
            records: Vec::new(),
            wait_histogram: HdrHistogram::new_with_bounds(1, MAX_TRACKED_WAIT_UNITS, 3)
                .expect("wait histogram bounds are valid"),
        }
    }

    /// Record a finished client.
    pub fn record(&mut self, record: ClientRecord) {
        let wait = record.wait().as_minutes();
        let service = record.service_duration().as_minutes();

        self.total_wait_accum += wait;
        self.total_service_accum += service;
        self.clients_completed += 1;
        self.wait_histogram
            .saturating_record((wait * HISTOGRAM_UNITS_PER_MINUTE).round() as u64);

        counter!("salonsim_clients_completed", "category" => record.service_category.clone()).increment(1);
        histogram!("salonsim_wait_minutes").record(wait);
        histogram!("salonsim_service_minutes", "category" => record.service_category.clone()).record(service);

        self.records.push(record);
    }

    /// Fix the simulated duration; called by the simulation when the run ends.
    pub fn set_final_clock(&mut self, time: SimTime) {
        self.final_clock = time;
        gauge!("salonsim_final_clock_minutes").set(time.as_minutes());
    }

    /// Count `servers` more seats towards utilization; one call per pool.
    pub(crate) fn add_capacity(&mut self, servers: usize) {
        self.capacity += servers;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_wait(&self) -> f64 {
        self.total_wait_accum
    }

    pub fn total_service(&self) -> f64 {
        self.total_service_accum
    }

    pub fn clients_completed(&self) -> u64 {
        self.clients_completed
    }

    pub fn final_clock(&self) -> SimTime {
        self.final_clock
    }

    /// Completed visits, in completion order
    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    /// Mean time between arrival and service start, in minutes
    pub fn average_wait(&self) -> Result<f64, StatsError> {
        self.require_clients("average wait")?;
        Ok(self.total_wait_accum / self.clients_completed as f64)
    }

    /// Mean service duration, in minutes
    pub fn average_service_time(&self) -> Result<f64, StatsError> {
        self.require_clients("average service time")?;
        Ok(self.total_service_accum / self.clients_completed as f64)
    }

    /// Fraction of server-minutes spent serving
    pub fn utilization(&self) -> Result<f64, StatsError> {
        self.require_clients("utilization")?;
        self.require_elapsed("utilization")?;
        Ok(self.total_service_accum / (self.capacity as f64 * self.final_clock.as_minutes()))
    }

    /// Little's-Law estimate `L = total wait / elapsed time`.
    ///
    /// Only meaningful when arrivals are roughly stationary over the run; it
    /// is not a sampled queue length.
    pub fn average_queue_length(&self) -> Result<f64, StatsError> {
        self.require_clients("average queue length")?;
        self.require_elapsed("average queue length")?;
        Ok(self.total_wait_accum / self.final_clock.as_minutes())
    }

    /// Wait time at the given percentile (0-100), in minutes
    pub fn wait_percentile(&self, percentile: f64) -> Result<f64, StatsError> {
        self.require_clients("wait percentile")?;
        let units = self.wait_histogram.value_at_percentile(percentile);
        Ok(units as f64 / HISTOGRAM_UNITS_PER_MINUTE)
    }

    /// Longest wait recorded, in minutes
    pub fn max_wait(&self) -> Result<f64, StatsError> {
        self.require_clients("maximum wait")?;
        Ok(self
            .records
            .iter()
            .map(|r| r.wait().as_minutes())
            .fold(0.0, f64::max))
    }

    /// Serialisable snapshot; derived fields are `None` where data is missing.
    pub fn summary(&self) -> SummaryStatistics {
        SummaryStatistics {
            clients_served: self.clients_completed,
            servers: self.capacity,
            simulated_minutes: self.final_clock.as_minutes(),
            total_wait_minutes: self.total_wait_accum,
            total_service_minutes: self.total_service_accum,
            average_wait: self.average_wait().ok(),
            average_service_time: self.average_service_time().ok(),
            average_queue_length: self.average_queue_length().ok(),
            utilization: self.utilization().ok(),
            p95_wait: self.wait_percentile(95.0).ok(),
            max_wait: self.max_wait().ok(),
        }
    }

    fn require_clients(&self, statistic: &'static str) -> Result<(), StatsError> {
        if self.clients_completed == 0 {
            return Err(StatsError::InsufficientData {
                statistic,
                reason: "no clients completed",
            });
        }
        Ok(())
    }

    fn require_elapsed(&self, statistic: &'static str) -> Result<(), StatsError> {
        if self.final_clock.is_zero() {
            return Err(StatsError::InsufficientData {
                statistic,
                reason: "no simulated time elapsed",
            });
        }
        Ok(())
    }
}

/// Summary statistics for a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub clients_served: u64,
    pub servers: usize,
    pub simulated_minutes: f64,
    pub total_wait_minutes: f64,
    pub total_service_minutes: f64,
    pub average_wait: Option<f64>,
    pub average_service_time: Option<f64>,
    pub average_queue_length: Option<f64>,
    pub utilization: Option<f64>,
    pub p95_wait: Option<f64>,
    pub max_wait: Option<f64>,
}

impl std::fmt::Display for SummaryStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn opt(v: Option<f64>) -> String {
            v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
        }
        write!(
            f,
            "{} clients over {:.2} min on {} servers: avg wait {}, avg queue {}, utilization {}",
            self.clients_served,
            self.simulated_minutes,
            self.servers,
            opt(self.average_wait),
            opt(self.average_queue_length),
            opt(self.utilization),
        )
    }
}
