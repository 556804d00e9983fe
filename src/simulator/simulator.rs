use ::sim::simulator::Simulation;
use ::sim::utils::errors::SimulationError;
use log::{debug, error, info};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Result, Write};

use super::config::config::AppConfig;
use super::sim::inject::inject_tick;
use super::sim::mode::{SimConfig, StepMode};
use super::sim::shell::{Command, Shell};
use super::utils::report::{print_grid, print_simulation_records};
use crate::arch::tensor_array::reference::{compare, ReferenceModel};
use crate::arch::tensor_array::{create_simulation, ArrayConfig, Grid, OutputFrame, TickInput, SAMPLER_MODEL_ID};

/// Steps allowed between injecting a tick and sampling its frame
const MAX_STEPS_PER_TICK: usize = 4;

/// One line of the trace file
#[derive(Serialize)]
struct TraceRecord<'a> {
  cycle: u64,
  time: f64,
  reset: bool,
  outputs: &'a Grid<i64>,
}

/// Outcome of a stimulus run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
  pub ticks: u64,
  pub mismatches: usize,
  pub outputs: Grid<i64>,
}

fn sim_error(e: SimulationError) -> io::Error {
  io::Error::new(io::ErrorKind::InvalidInput, format!("simulation error: {}", e))
}

pub struct Simulator {
  config: SimConfig,
  array_config: ArrayConfig,
  simulation: Simulation,
  reference: Option<ReferenceModel>,
  trace_writer: Option<BufWriter<File>>,
  last_frame: Option<OutputFrame>,
  mismatches: usize,
}

impl Simulator {
  pub fn new(config: SimConfig, array_config: ArrayConfig) -> Result<Self> {
    let simulation = create_simulation(array_config, config.clock_period)?;

    let reference = if config.check {
      Some(ReferenceModel::new(array_config))
    } else {
      None
    };

    let trace_writer = match &config.trace_file {
      Some(path) => Some(BufWriter::new(File::create(path)?)),
      None => None,
    };

    info!(
      "{}x{} tensor array, W={}, {}-bit {:?} accumulators",
      array_config.dim,
      array_config.dim,
      array_config.vector_width,
      array_config.accumulator.bits(),
      array_config.accumulator.overflow()
    );

    Ok(Self {
      config,
      array_config,
      simulation,
      reference,
      trace_writer,
      last_frame: None,
      mismatches: 0,
    })
  }

  pub fn from_app_config(app_config: &AppConfig) -> Result<Self> {
    let config = app_config.to_sim_config()?;
    let array_config = app_config.array.to_array_config()?;
    Self::new(config, array_config)
  }

  /// Drive one tick through the simulation and return the sampled frame
  pub fn tick(&mut self, input: &TickInput) -> Result<OutputFrame> {
    self.array_config.check_input(input)?;
    inject_tick(&mut self.simulation, input)?;

    let mut sampled = None;
    for _ in 0..MAX_STEPS_PER_TICK {
      let messages = self.simulation.step().map_err(sim_error)?;
      if let Some(msg) = messages.iter().find(|m| m.target_id() == SAMPLER_MODEL_ID) {
        let frame: OutputFrame =
          serde_json::from_str(msg.content()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        sampled = Some(frame);
        break;
      }
    }
    let frame = sampled.ok_or_else(|| {
      io::Error::new(
        io::ErrorKind::TimedOut,
        format!("no output frame within {} steps", MAX_STEPS_PER_TICK),
      )
    })?;

    let time = self.simulation.get_global_time();
    debug!("t={:.1} cycle {} reset={}", time, frame.cycle, input.reset);

    if let Some(reference) = self.reference.as_mut() {
      let expected = reference.apply(input)?;
      for m in compare(&expected, &frame.outputs) {
        error!(
          "cycle {}: PE[{}][{}] expected {}, got {}",
          frame.cycle, m.row, m.col, m.expected, m.actual
        );
        self.mismatches += 1;
      }
    }

    if let Some(writer) = self.trace_writer.as_mut() {
      let record = TraceRecord {
        cycle: frame.cycle,
        time,
        reset: input.reset,
        outputs: &frame.outputs,
      };
      serde_json::to_writer(&mut *writer, &record).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
      writeln!(writer)?;
    }

    self.last_frame = Some(frame.clone());
    Ok(frame)
  }

  /// Run a stimulus sequence in the configured step mode
  pub fn run(&mut self, ticks: &[TickInput]) -> Result<RunSummary> {
    let issued = match self.config.step_mode {
      StepMode::Continuous => self.run_continuous(ticks)?,
      StepMode::Step => self.run_step_mode(ticks)?,
    };

    if let Some(writer) = self.trace_writer.as_mut() {
      writer.flush()?;
    }

    let summary = RunSummary {
      ticks: issued,
      mismatches: self.mismatches,
      outputs: self.outputs(),
    };
    info!("{} ticks issued, {} reference mismatches", summary.ticks, summary.mismatches);
    Ok(summary)
  }

  fn run_continuous(&mut self, ticks: &[TickInput]) -> Result<u64> {
    for input in ticks {
      self.tick(input)?;
    }
    Ok(ticks.len() as u64)
  }

  fn run_step_mode(&mut self, ticks: &[TickInput]) -> Result<u64> {
    println!("Step mode - Enter: step, si N: step N ticks, p: print outputs, c: continue, q: quit");
    let mut shell = Shell::new()?;
    let mut next = 0;

    while next < ticks.len() {
      match shell.read_command()? {
        Command::Step(n) => {
          let end = (next + n as usize).min(ticks.len());
          for input in &ticks[next..end] {
            let frame = self.tick(input)?;
            if !self.config.quiet {
              print_grid(&format!("cycle {}", frame.cycle), &frame.outputs);
            }
          }
          next = end;
        },
        Command::Print => print_grid("outputs", &self.outputs()),
        Command::Continue => {
          self.run_continuous(&ticks[next..])?;
          next = ticks.len();
        },
        Command::Quit => break,
      }
    }
    Ok(next as u64)
  }

  /// Committed outputs of the last sampled frame, zeros before the first tick
  pub fn outputs(&self) -> Grid<i64> {
    match &self.last_frame {
      Some(frame) => frame.outputs.clone(),
      None => vec![vec![0; self.array_config.dim]; self.array_config.dim],
    }
  }

  pub fn last_frame(&self) -> Option<&OutputFrame> {
    self.last_frame.as_ref()
  }

  pub fn mismatches(&self) -> usize {
    self.mismatches
  }

  pub fn global_time(&self) -> f64 {
    self.simulation.get_global_time()
  }

  pub fn config(&self) -> &SimConfig {
    &self.config
  }

  pub fn array_config(&self) -> &ArrayConfig {
    &self.array_config
  }

  pub fn print_records(&mut self) {
    print_simulation_records(&mut self.simulation);
  }
}
