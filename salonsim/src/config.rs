//! Salon run configuration.
//!
//! Every field has a default, so a JSON document only needs the fields it
//! changes:
//!
//! ```json
//! { "servers": 4, "population": { "kind": "fixed", "count": 30 } }
//! ```

use salonsim_core::client::ServiceCatalog;
use salonsim_core::dists::{Population, UniformServiceTime};
use salonsim_core::SimTime;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding an inline JSON configuration.
pub const CONFIG_ENV: &str = "SALONSIM_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SalonConfig {
    /// Seed of the run's random stream.
    pub seed: u64,
    /// Number of stylists working in parallel.
    pub servers: usize,
    /// Mean of the exponential gap between arrivals.
    pub mean_interarrival_minutes: f64,
    /// Services on offer; each client picks one uniformly.
    pub services: Vec<ServiceCategoryConfig>,
    /// How many clients show up during the day.
    pub population: PopulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceCategoryConfig {
    pub name: String,
    pub min_minutes: f64,
    pub max_minutes: f64,
}

impl ServiceCategoryConfig {
    pub fn new(name: impl Into<String>, min_minutes: f64, max_minutes: f64) -> Self {
        Self {
            name: name.into(),
            min_minutes,
            max_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PopulationConfig {
    Fixed { count: usize },
    Poisson { mean: f64 },
}

impl From<PopulationConfig> for Population {
    fn from(config: PopulationConfig) -> Self {
        match config {
            PopulationConfig::Fixed { count } => Population::Fixed(count),
            PopulationConfig::Poisson { mean } => Population::Poisson { mean },
        }
    }
}

impl Default for SalonConfig {
    fn default() -> Self {
        Self {
            seed: 10,
            servers: 10,
            mean_interarrival_minutes: 15.0,
            services: vec![
                ServiceCategoryConfig::new("men's cut", 15.0, 35.0),
                ServiceCategoryConfig::new("women's cut", 35.0, 45.0),
                ServiceCategoryConfig::new("special cut", 45.0, 55.0),
                ServiceCategoryConfig::new("manicure", 55.0, 60.0),
                ServiceCategoryConfig::new("pedicure", 60.0, 70.0),
            ],
            population: PopulationConfig::Poisson { mean: 15.0 },
        }
    }
}

impl SalonConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads [`CONFIG_ENV`]; defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(json) => Self::from_json_str(&json),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(std::env::VarError::NotUnicode(_)) => {
                Err(ConfigError::Invalid(format!("{CONFIG_ENV} is not valid UTF-8")))
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers == 0 {
            return Err(ConfigError::Invalid("servers must be at least 1".to_string()));
        }
        if !(self.mean_interarrival_minutes.is_finite() && self.mean_interarrival_minutes > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "mean_interarrival_minutes must be positive, got {}",
                self.mean_interarrival_minutes
            )));
        }
        if self.services.is_empty() {
            return Err(ConfigError::Invalid("at least one service is required".to_string()));
        }
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(ConfigError::Invalid("service names cannot be blank".to_string()));
            }
            let bounded = service.min_minutes.is_finite() && service.max_minutes.is_finite();
            if !bounded || service.min_minutes <= 0.0 || service.min_minutes > service.max_minutes {
                return Err(ConfigError::Invalid(format!(
                    "service '{}' needs 0 < min_minutes <= max_minutes, got [{}, {}]",
                    service.name, service.min_minutes, service.max_minutes
                )));
            }
        }
        if let PopulationConfig::Poisson { mean } = self.population {
            if !(mean.is_finite() && mean > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "Poisson population mean must be positive, got {mean}"
                )));
            }
        }
        Ok(())
    }

    /// Builds the service catalog described by `services`.
    pub fn catalog(&self) -> Result<ServiceCatalog, ConfigError> {
        let mut catalog = ServiceCatalog::new();
        for service in &self.services {
            let min = SimTime::try_from_minutes(service.min_minutes)?;
            let max = SimTime::try_from_minutes(service.max_minutes)?;
            catalog.add(service.name.clone(), Box::new(UniformServiceTime::new(min, max)?));
        }
        Ok(catalog)
    }
}
