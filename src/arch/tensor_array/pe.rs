// Processing Element (PE) - one accumulator plus latched operand copies

use super::accumulator::AccumulatorFormat;
use super::signals::Vector;
use crate::error::{ArrayError, Operand, Result};

/// How defined a PE's accumulator is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PePhase {
  /// Never reset or loaded since construction
  Undefined,
  /// Cleared by reset
  Zero,
  /// Overwritten by load or preload on the last tick
  Loaded,
  /// Summed onto a prior value
  Accumulating,
}

/// Control resolved for one cell on one tick
///
/// Priority is reset, then preload (bias or injected partial sum), then load,
/// then accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeControl {
  Reset,
  /// Overwrite with `value`; `defined` is false when the value came from an undefined cell
  Preload { value: i64, defined: bool },
  Load,
  Accumulate,
}

impl PeControl {
  pub fn from_signals(load: bool, reset: bool) -> Self {
    if reset {
      PeControl::Reset
    } else if load {
      PeControl::Load
    } else {
      PeControl::Accumulate
    }
  }
}

/// Post-tick PE state, staged until every cell has been evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeNext {
  pub acc: i64,
  pub phase: PePhase,
  left: Vector,
  top: Vector,
}

/// Exact dot product of two equal-width operand vectors
pub fn dot(row_vec: &[i8], col_vec: &[i8]) -> i64 {
  row_vec
    .iter()
    .zip(col_vec.iter())
    .map(|(&a, &b)| a as i64 * b as i64)
    .sum()
}

/// Processing Element - performs one vector multiply-accumulate per tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingElement {
  /// Row vector latched on the last tick (passed through as `right_out`)
  left: Vector,
  /// Column vector latched on the last tick (passed through as `bottom_out`)
  top: Vector,
  acc: i64,
  phase: PePhase,
  row: usize,
  col: usize,
}

impl ProcessingElement {
  pub fn new(row: usize, col: usize, vector_width: usize) -> Self {
    Self {
      left: vec![0; vector_width],
      top: vec![0; vector_width],
      acc: 0,
      phase: PePhase::Undefined,
      row,
      col,
    }
  }

  /// Operand width W this PE was built for
  pub fn vector_width(&self) -> usize {
    self.left.len()
  }

  fn check_width(&self, operand: Operand, vector: &[i8]) -> Result<()> {
    if vector.len() != self.vector_width() {
      return Err(ArrayError::VectorWidth {
        operand,
        index: match operand {
          Operand::A => self.row,
          Operand::B => self.col,
        },
        expected: self.vector_width(),
        actual: vector.len(),
      });
    }
    Ok(())
  }

  /// Compute the post-tick state without touching `self`
  ///
  /// Both operands must be exactly W wide, even on a reset tick.
  pub fn evaluate(
    &self,
    row_vec: &[i8],
    col_vec: &[i8],
    control: PeControl,
    fmt: &AccumulatorFormat,
  ) -> Result<PeNext> {
    self.check_width(Operand::A, row_vec)?;
    self.check_width(Operand::B, col_vec)?;

    if control == PeControl::Reset {
      return Ok(PeNext {
        acc: 0,
        phase: PePhase::Zero,
        left: vec![0; self.vector_width()],
        top: vec![0; self.vector_width()],
      });
    }

    let (acc, phase) = match control {
      PeControl::Preload { value, defined } => {
        let phase = if defined { PePhase::Loaded } else { PePhase::Undefined };
        (fmt.reduce(value as i128), phase)
      },
      PeControl::Load => (fmt.reduce(dot(row_vec, col_vec) as i128), PePhase::Loaded),
      _ => {
        let phase = match self.phase {
          PePhase::Undefined => PePhase::Undefined,
          _ => PePhase::Accumulating,
        };
        (fmt.add(self.acc, dot(row_vec, col_vec)), phase)
      },
    };

    Ok(PeNext {
      acc,
      phase,
      left: row_vec.to_vec(),
      top: col_vec.to_vec(),
    })
  }

  /// Latch a staged state
  pub fn commit(&mut self, next: PeNext) {
    self.acc = next.acc;
    self.phase = next.phase;
    self.left = next.left;
    self.top = next.top;
  }

  /// Evaluate and commit in one step, returning the new accumulator
  ///
  /// Only safe for a lone PE; the array stages every cell before committing.
  pub fn update(
    &mut self,
    row_vec: &[i8],
    col_vec: &[i8],
    load: bool,
    reset: bool,
    fmt: &AccumulatorFormat,
  ) -> Result<i64> {
    let next = self.evaluate(row_vec, col_vec, PeControl::from_signals(load, reset), fmt)?;
    self.commit(next);
    Ok(self.acc)
  }

  pub fn accumulator(&self) -> i64 {
    self.acc
  }

  pub fn phase(&self) -> PePhase {
    self.phase
  }

  pub fn is_defined(&self) -> bool {
    self.phase != PePhase::Undefined
  }

  /// Row vector to propagate rightward
  pub fn right_out(&self) -> &[i8] {
    &self.left
  }

  /// Column vector to propagate downward
  pub fn bottom_out(&self) -> &[i8] {
    &self.top
  }

  pub fn row(&self) -> usize {
    self.row
  }

  pub fn col(&self) -> usize {
    self.col
  }
}
