pub mod accumulator;
pub mod array;
pub mod controller;
pub mod model;
pub mod pe;
pub mod reference;
pub mod signals;

pub use accumulator::{AccumulatorFormat, OverflowPolicy};
pub use array::{ArrayConfig, SystolicTensorArray};
pub use controller::{ArrayController, PeState};
pub use model::{OutputSampler, TensorArrayModel};
pub use pe::{PePhase, ProcessingElement};
pub use signals::{BiasPreload, Grid, OutputFrame, TickInput, Vector};

use sim::models::Model;
use sim::simulator::{Connector, Simulation};

use crate::error::Result;

/// Model id of the clocked array inside the simulation
pub const ARRAY_MODEL_ID: &str = "tensor_array";
/// Model id of the output sampler
pub const SAMPLER_MODEL_ID: &str = "sampler";
/// Input port the driver targets
pub const TICK_IN_PORT: &str = "tick_in";

/// Build a simulation with the array wired to an output sampler
///
///   driver --tick_in--> tensor_array --c_out--> sampler
pub fn create_simulation(config: ArrayConfig, clock_period: f64) -> Result<Simulation> {
  let array = SystolicTensorArray::new(config)?;

  let models = vec![
    Model::new(
      String::from(ARRAY_MODEL_ID),
      Box::new(TensorArrayModel::new(
        String::from(TICK_IN_PORT),
        String::from("c_out"),
        array,
        clock_period,
      )),
    ),
    Model::new(
      String::from(SAMPLER_MODEL_ID),
      Box::new(OutputSampler::new(String::from("c_in"))),
    ),
  ];

  let connectors = vec![Connector::new(
    String::from("array_to_sampler"),
    String::from(ARRAY_MODEL_ID),
    String::from(SAMPLER_MODEL_ID),
    String::from("c_out"),
    String::from("c_in"),
  )];

  Ok(Simulation::post(models, connectors))
}
