use salonsim_core::SimError;
use thiserror::Error;

/// Errors raised while configuring or running a salon scenario
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("failed decoding json configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),
}
