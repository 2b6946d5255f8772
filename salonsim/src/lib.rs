//! Hair salon scenario: clients arrive at random, wait for a free stylist,
//! receive one of several services, and leave.
//!
//! ```rust
//! use salonsim::{Salon, SalonConfig};
//!
//! let summary = Salon::new(&SalonConfig::default()).unwrap().run().unwrap();
//! println!("{}", salonsim::summary::render_text(&summary));
//! ```

pub mod config;
pub mod error;
pub mod scenario;
pub mod summary;

pub use config::{PopulationConfig, SalonConfig, ServiceCategoryConfig};
pub use error::ConfigError;
pub use scenario::Salon;
pub use summary::OutputFormat;
