#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
  Continuous,
  Step,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
  pub quiet: bool,
  pub step_mode: StepMode,
  pub trace_file: Option<String>,
  /// Compare every tick against the reference model
  pub check: bool,
  /// Simulated time between a latched input and its clock edge
  pub clock_period: f64,
}

impl Default for SimConfig {
  fn default() -> Self {
    Self {
      quiet: false,
      step_mode: StepMode::Continuous,
      trace_file: None,
      check: true,
      clock_period: 1.0,
    }
  }
}
