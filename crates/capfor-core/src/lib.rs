//! Shared types for the capfor pipeline: energy types, weather feature
//! channels, run configuration and the unified error type.

pub mod config;
pub mod energy;
pub mod error;
pub mod features;

pub use config::{CapforConfig, ForecastConfig, PathsConfig, SearchConfig};
pub use energy::{region_key, EnergyType, Shore};
pub use error::{CapforError, CapforResult};
pub use features::{feature_set, Feature, ALL_FEATURES};
