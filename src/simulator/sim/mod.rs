pub mod inject;
pub mod mode;
pub mod records;
pub mod shell;
pub mod stimulus;

pub use mode::{SimConfig, StepMode};
