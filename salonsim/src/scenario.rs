//! Wires a [`SalonConfig`] into a ready-to-run [`Simulation`].

use salonsim_core::client::ClientGenerator;
use salonsim_core::dists::{ExponentialArrivals, Population};
use salonsim_core::{Reporter, ResourceId, Simulation, SummaryStatistics};
use tracing::info;

use crate::config::SalonConfig;
use crate::error::ConfigError;

/// A configured salon day, not yet run.
pub struct Salon {
    simulation: Simulation,
    servers: ResourceId,
    clients: usize,
}

impl Salon {
    /// Builds the day described by `config`, reporting through tracing.
    pub fn new(config: &SalonConfig) -> Result<Self, ConfigError> {
        Self::build(config, Simulation::new(config.seed))
    }

    /// Builds the day described by `config`, sending events to `reporter`.
    pub fn with_reporter(config: &SalonConfig, reporter: impl Reporter + 'static) -> Result<Self, ConfigError> {
        Self::build(config, Simulation::new(config.seed).with_reporter(reporter))
    }

    fn build(config: &SalonConfig, mut simulation: Simulation) -> Result<Self, ConfigError> {
        config.validate()?;
        let servers = simulation.add_resource("stylists", config.servers)?;
        // The population is the stream's first draw, before any arrival gap.
        let clients = Population::from(config.population).resolve(simulation.rng_mut())?;
        let arrivals = ExponentialArrivals::new(config.mean_interarrival_minutes)?;
        simulation.spawn(Box::new(ClientGenerator::new(
            clients,
            arrivals,
            servers,
            config.catalog()?,
        )?))?;
        info!(
            seed = config.seed,
            servers = config.servers,
            clients,
            "Salon opened"
        );
        Ok(Self {
            simulation,
            servers,
            clients,
        })
    }

    /// Clients that will arrive during the day.
    pub fn clients(&self) -> usize {
        self.clients
    }

    pub fn servers(&self) -> ResourceId {
        self.servers
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Runs the day to the last departure.
    pub fn run(mut self) -> Result<SummaryStatistics, ConfigError> {
        let summary = self.simulation.run()?.summary();
        info!(
            clients_served = summary.clients_served,
            simulated_minutes = summary.simulated_minutes,
            "Salon closed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use salonsim_core::{RecordingReporter, SimEvent};

    use super::*;
    use crate::config::PopulationConfig;

    fn config(count: usize) -> SalonConfig {
        SalonConfig {
            population: PopulationConfig::Fixed { count },
            ..SalonConfig::default()
        }
    }

    #[test]
    fn test_fixed_population_is_fully_served() {
        let salon = Salon::new(&config(12)).unwrap();
        assert_eq!(salon.clients(), 12);
        assert_eq!(salon.simulation().resource(salon.servers()).unwrap().capacity(), 10);

        let summary = salon.run().unwrap();
        assert_eq!(summary.clients_served, 12);
        assert_eq!(summary.servers, 10);
        assert!(summary.average_wait.is_some());
    }

    #[test]
    fn test_default_day_is_reproducible() {
        let first = Salon::new(&SalonConfig::default()).unwrap();
        let second = Salon::new(&SalonConfig::default()).unwrap();
        assert_eq!(first.clients(), second.clients());
        assert_eq!(first.run().unwrap(), second.run().unwrap());
    }

    #[test]
    fn test_services_come_from_the_catalog() {
        let reporter = RecordingReporter::new();
        let config = config(40);
        Salon::with_reporter(&config, reporter.clone())
            .unwrap()
            .run()
            .unwrap();

        let names: Vec<&str> = config.services.iter().map(|s| s.name.as_str()).collect();
        for event in reporter.events() {
            if let SimEvent::ServiceCompleted { category, duration, .. } = event {
                let service = config
                    .services
                    .iter()
                    .find(|s| s.name == category)
                    .unwrap_or_else(|| panic!("{category} not in {names:?}"));
                let minutes = duration.as_minutes();
                assert!(minutes >= service.min_minutes && minutes <= service.max_minutes);
            }
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SalonConfig {
            servers: 0,
            ..SalonConfig::default()
        };
        assert!(matches!(Salon::new(&config), Err(ConfigError::Invalid(_))));
    }
}
