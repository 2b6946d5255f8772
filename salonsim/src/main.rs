use std::process::ExitCode;

use salonsim::{summary, ConfigError, OutputFormat, Salon, SalonConfig};
use salonsim_core::{init_simulation_logging, simulation_span};
use tracing::error;

fn run() -> Result<String, ConfigError> {
    let config = SalonConfig::from_env()?;
    let format = OutputFormat::from_env()?;
    let _span = simulation_span("salon", config.seed).entered();
    let salon = Salon::new(&config)?;
    let summary = salon.run()?;
    summary::render(&summary, format)
}

fn main() -> ExitCode {
    init_simulation_logging();

    match run() {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "Salon simulation failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
