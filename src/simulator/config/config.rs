use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::arch::tensor_array::accumulator::DEFAULT_ACC_BITS;
use crate::arch::tensor_array::{AccumulatorFormat, ArrayConfig, OverflowPolicy};
use crate::simulator::sim::mode::{SimConfig, StepMode};

/// Environment prefix, e.g. `STASIM__ARRAY__DIM=8`
pub const ENV_PREFIX: &str = "STASIM";

/// Array construction parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArraySection {
  #[serde(default = "default_dim")]
  pub dim: usize,
  #[serde(default = "default_vector_width")]
  pub vector_width: usize,
  #[serde(default = "default_acc_bits")]
  pub acc_bits: u32,
  #[serde(default)]
  pub overflow: OverflowPolicy,
}

fn default_dim() -> usize {
  4
}

fn default_vector_width() -> usize {
  4
}

fn default_acc_bits() -> u32 {
  DEFAULT_ACC_BITS
}

impl Default for ArraySection {
  fn default() -> Self {
    Self {
      dim: default_dim(),
      vector_width: default_vector_width(),
      acc_bits: default_acc_bits(),
      overflow: OverflowPolicy::default(),
    }
  }
}

impl ArraySection {
  pub fn to_array_config(&self) -> io::Result<ArrayConfig> {
    let accumulator = AccumulatorFormat::new(self.acc_bits, self.overflow)?;
    Ok(ArrayConfig::new(self.dim, self.vector_width, accumulator)?)
  }
}

/// Simulation driver settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationSection {
  #[serde(default)]
  pub quiet: bool,
  #[serde(default)]
  pub step_mode: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trace_file: Option<String>,
  #[serde(default = "default_check")]
  pub check: bool,
  #[serde(default = "default_clock_period")]
  pub clock_period: f64,
  /// Stimulus file used when none is given on the command line
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stimulus: Option<String>,
}

fn default_check() -> bool {
  true
}

fn default_clock_period() -> f64 {
  1.0
}

impl Default for SimulationSection {
  fn default() -> Self {
    Self {
      quiet: false,
      step_mode: false,
      trace_file: None,
      check: default_check(),
      clock_period: default_clock_period(),
      stimulus: None,
    }
  }
}

/// Unified application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
  #[serde(default)]
  pub array: ArraySection,
  #[serde(default)]
  pub simulation: SimulationSection,
}

impl AppConfig {
  pub fn to_sim_config(&self) -> io::Result<SimConfig> {
    if !(self.simulation.clock_period > 0.0) {
      return Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("clock_period must be positive, got {}", self.simulation.clock_period),
      ));
    }
    Ok(SimConfig {
      quiet: self.simulation.quiet,
      step_mode: if self.simulation.step_mode {
        StepMode::Step
      } else {
        StepMode::Continuous
      },
      trace_file: self.simulation.trace_file.clone(),
      check: self.simulation.check,
      clock_period: self.simulation.clock_period,
    })
  }

  pub fn to_toml(&self) -> io::Result<String> {
    toml::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
  }
}

pub fn default_config_path() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("src")
    .join("simulator")
    .join("config")
    .join("default.toml")
}

/// Load default.toml on its own, without environment overrides
pub fn load_default_config() -> io::Result<AppConfig> {
  let path = default_config_path();
  let content = fs::read_to_string(&path)
    .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("cannot read config file {:?}: {}", path, e)))?;
  parse_config(&content)
}

/// Parse a TOML configuration string
pub fn parse_config(content: &str) -> io::Result<AppConfig> {
  toml::from_str::<AppConfig>(content)
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("failed to parse TOML config: {}", e)))
}

/// Layer default.toml, an optional user file, then `STASIM__*` environment variables
pub fn load_config(user_path: Option<&Path>) -> io::Result<AppConfig> {
  let mut builder = Config::builder()
    .add_source(File::from(default_config_path().as_path()).format(FileFormat::Toml).required(false));

  if let Some(path) = user_path {
    if !path.exists() {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("config file {:?} does not exist", path),
      ));
    }
    builder = builder.add_source(File::from(path).format(FileFormat::Toml));
  }

  builder
    .add_source(
      Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .and_then(|settings| settings.try_deserialize::<AppConfig>())
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("failed to load config: {}", e)))
}

/// Command-line values that take precedence over every config layer
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
  pub quiet: bool,
  pub step: bool,
  /// `Some(false)` turns the reference check off
  pub check: Option<bool>,
  pub trace_file: Option<String>,
  pub stimulus: Option<String>,
  pub dim: Option<usize>,
  pub vector_width: Option<usize>,
  pub acc_bits: Option<u32>,
  pub overflow: Option<OverflowPolicy>,
}

/// Apply CLI arguments on top of a loaded config
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &CliOverrides) {
  if cli.quiet {
    config.simulation.quiet = true;
  }
  if cli.step {
    config.simulation.step_mode = true;
  }
  if let Some(check) = cli.check {
    config.simulation.check = check;
  }
  if let Some(file) = &cli.trace_file {
    config.simulation.trace_file = Some(file.clone());
  }
  if let Some(file) = &cli.stimulus {
    config.simulation.stimulus = Some(file.clone());
  }
  if let Some(dim) = cli.dim {
    config.array.dim = dim;
  }
  if let Some(width) = cli.vector_width {
    config.array.vector_width = width;
  }
  if let Some(bits) = cli.acc_bits {
    config.array.acc_bits = bits;
  }
  if let Some(overflow) = cli.overflow {
    config.array.overflow = overflow;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_toml_matches_defaults() {
    let config = load_default_config().unwrap();
    assert_eq!(config, AppConfig::default());
  }

  #[test]
  fn test_parse_partial_config() {
    let config = parse_config("[array]\ndim = 8\noverflow = \"saturate\"\n").unwrap();
    assert_eq!(config.array.dim, 8);
    assert_eq!(config.array.vector_width, 4);
    assert_eq!(config.array.overflow, OverflowPolicy::Saturate);
    assert!(config.simulation.check);

    let array = config.array.to_array_config().unwrap();
    assert_eq!(array.dim, 8);
    assert_eq!(array.accumulator.overflow(), OverflowPolicy::Saturate);
  }

  #[test]
  fn test_bad_config_rejected() {
    let err = parse_config("[array]\ndim = \"four\"\n").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    let mut config = AppConfig::default();
    config.array.acc_bits = 1;
    assert_eq!(config.array.to_array_config().unwrap_err().kind(), io::ErrorKind::InvalidInput);

    config.simulation.clock_period = 0.0;
    assert!(config.to_sim_config().is_err());
  }

  #[test]
  fn test_cli_overrides() {
    let mut config = AppConfig::default();
    let cli = CliOverrides {
      step: true,
      trace_file: Some("trace.jsonl".to_string()),
      dim: Some(2),
      overflow: Some(OverflowPolicy::Saturate),
      ..Default::default()
    };
    apply_cli_overrides(&mut config, &cli);
    assert_eq!(config.array.dim, 2);
    assert!(config.simulation.check);
    assert_eq!(config.array.overflow, OverflowPolicy::Saturate);

    let sim = config.to_sim_config().unwrap();
    assert_eq!(sim.step_mode, StepMode::Step);
    assert_eq!(sim.trace_file.as_deref(), Some("trace.jsonl"));
  }

  #[test]
  fn test_cli_disables_check() {
    let mut config = parse_config("[simulation]\ncheck = true\n").unwrap();
    let cli = CliOverrides {
      check: Some(false),
      ..Default::default()
    };
    apply_cli_overrides(&mut config, &cli);
    assert!(!config.to_sim_config().unwrap().check);
  }

  #[test]
  fn test_load_user_file() {
    let path = std::env::temp_dir().join(format!("stasim_config_{}.toml", std::process::id()));
    fs::write(&path, "[array]\nvector_width = 2\n[simulation]\nclock_period = 2.5\n").unwrap();
    let config = load_config(Some(&path)).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(config.array.vector_width, 2);
    assert_eq!(config.simulation.clock_period, 2.5);

    assert!(load_config(Some(Path::new("/nonexistent/stasim.toml"))).is_err());
  }

  #[test]
  fn test_to_toml_round_trips() {
    let config = AppConfig::default();
    let text = config.to_toml().unwrap();
    assert!(text.contains("[array]"));
    assert_eq!(parse_config(&text).unwrap(), config);
  }
}
