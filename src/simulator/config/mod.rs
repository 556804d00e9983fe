pub mod config;

pub use config::{load_config, AppConfig, ArraySection, CliOverrides, SimulationSection};
