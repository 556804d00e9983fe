pub mod arch;
pub mod error;
pub mod simulator;

pub use arch::tensor_array::{
  AccumulatorFormat, ArrayConfig, ArrayController, OutputFrame, OverflowPolicy, SystolicTensorArray, TickInput,
};
pub use error::{ArrayError, Result};
pub use simulator::sim::mode::{SimConfig, StepMode};
pub use simulator::utils::log::init_log;
