use ::sim::simulator::{Message, Simulation};
use std::io;

use crate::arch::tensor_array::{TickInput, ARRAY_MODEL_ID, TICK_IN_PORT};

/// Inject one tick's inputs into the array model at the current global time
pub fn inject_tick(simulation: &mut Simulation, input: &TickInput) -> io::Result<()> {
  let content = serde_json::to_string(input).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
  let msg = Message::new(
    "driver".to_string(),
    "tick_out".to_string(),
    ARRAY_MODEL_ID.to_string(),
    TICK_IN_PORT.to_string(),
    simulation.get_global_time(),
    content,
  );
  simulation.inject_input(msg);
  Ok(())
}
