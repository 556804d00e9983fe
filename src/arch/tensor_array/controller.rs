// Array Controller - reset / load / accumulate / drain driving discipline

use log::debug;

use super::array::SystolicTensorArray;
use super::pe::PePhase;
use super::signals::{filled, BiasPreload, Grid, TickInput};
use crate::error::Result;

/// Collapsed per-PE state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeState {
  Zero,
  Loaded(i64),
  Accumulating(i64),
}

/// Drives an array through the legal phase sequence
///
/// Outputs are only meaningful after the first reset tick; before that
/// `outputs_trusted` is false and `cell_state` reports `None` for every
/// cell that was never loaded.
#[derive(Debug, Clone)]
pub struct ArrayController {
  array: SystolicTensorArray,
  last_input: Option<TickInput>,
  resets: u64,
}

impl ArrayController {
  pub fn new(array: SystolicTensorArray) -> Self {
    Self {
      array,
      last_input: None,
      resets: 0,
    }
  }

  /// Issue one tick and remember it for `hold`
  pub fn apply(&mut self, input: TickInput) -> Result<()> {
    self.array.step(&input)?;
    if input.reset {
      self.resets += 1;
    }
    debug!(
      "cycle {}: reset={} loads={}",
      self.array.cycle_count(),
      input.reset,
      input.load.iter().flatten().filter(|&&l| l).count()
    );
    self.last_input = Some(input);
    Ok(())
  }

  /// One reset tick; every accumulator becomes zero
  pub fn reset(&mut self) -> Result<()> {
    let (dim, width) = (self.array.dim(), self.array.vector_width());
    self.apply(TickInput::reset(dim, width))
  }

  /// Overwrite every cell with its one-shot dot product
  pub fn load(&mut self, a: Grid<i8>, b: Grid<i8>) -> Result<()> {
    let dim = self.array.dim();
    self.load_pattern(a, b, filled(dim, true))
  }

  pub fn load_pattern(&mut self, a: Grid<i8>, b: Grid<i8>, load: Grid<bool>) -> Result<()> {
    self.apply(TickInput::new(a, b, load, false))
  }

  /// One tick with load deasserted everywhere
  pub fn accumulate(&mut self, a: Grid<i8>, b: Grid<i8>) -> Result<()> {
    self.apply(TickInput::compute(a, b))
  }

  /// Re-supply the last operands with load deasserted, `ticks` times
  ///
  /// Non-zero operands keep accumulating the same dot products.
  pub fn hold(&mut self, ticks: usize) -> Result<()> {
    let (dim, width) = (self.array.dim(), self.array.vector_width());
    let held = match &self.last_input {
      Some(last) if !last.reset => TickInput::compute(last.a.clone(), last.b.clone()),
      _ => TickInput::zeros(dim, width),
    };
    for _ in 0..ticks {
      self.apply(held.clone())?;
    }
    Ok(())
  }

  /// Zero operands with load deasserted, `ticks` times; outputs stay put
  pub fn drain(&mut self, ticks: usize) -> Result<()> {
    let (dim, width) = (self.array.dim(), self.array.vector_width());
    for _ in 0..ticks {
      self.apply(TickInput::zeros(dim, width))?;
    }
    Ok(())
  }

  /// Preload every cell with a bias value
  pub fn preload_bias(&mut self, values: Grid<i64>) -> Result<()> {
    let (dim, width) = (self.array.dim(), self.array.vector_width());
    self.apply(TickInput::zeros(dim, width).with_bias(BiasPreload::all(values)))
  }

  /// Copy the row above into each selected row
  pub fn inject_partial_sums(&mut self, rows: &[usize]) -> Result<()> {
    let (dim, width) = (self.array.dim(), self.array.vector_width());
    let load_sum = (0..dim).map(|i| vec![rows.contains(&i); dim]).collect();
    self.apply(TickInput::zeros(dim, width).with_load_sum(load_sum))
  }

  pub fn cell_state(&self, row: usize, col: usize) -> Option<PeState> {
    let pe = self.array.pe(row, col)?;
    match pe.phase() {
      PePhase::Undefined => None,
      PePhase::Zero => Some(PeState::Zero),
      PePhase::Loaded => Some(PeState::Loaded(pe.accumulator())),
      PePhase::Accumulating => Some(PeState::Accumulating(pe.accumulator())),
    }
  }

  pub fn outputs_trusted(&self) -> bool {
    self.resets > 0
  }

  pub fn outputs(&self) -> Grid<i64> {
    self.array.outputs()
  }

  pub fn array(&self) -> &SystolicTensorArray {
    &self.array
  }

  pub fn into_array(self) -> SystolicTensorArray {
    self.array
  }
}
