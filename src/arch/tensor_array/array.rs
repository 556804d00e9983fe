// Systolic Tensor Array - N x N grid of PEs sharing one clock
//
// PE(i,j) sees row vector A[i] and column vector B[j] on every tick. Each tick
// evaluates the whole grid against the pre-tick snapshot into a staging grid and
// only then commits, so no cell observes another cell's post-tick value.

use super::accumulator::AccumulatorFormat;
use super::pe::{PeControl, PeNext, PePhase, ProcessingElement};
use super::signals::{Grid, TickInput};
use crate::error::{ArrayError, Operand, Result};

/// Construction parameters, fixed for the array's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayConfig {
  /// Array dimension N
  pub dim: usize,
  /// PE vector width W
  pub vector_width: usize,
  pub accumulator: AccumulatorFormat,
}

impl ArrayConfig {
  pub fn new(dim: usize, vector_width: usize, accumulator: AccumulatorFormat) -> Result<Self> {
    let config = Self {
      dim,
      vector_width,
      accumulator,
    };
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.dim == 0 {
      return Err(ArrayError::invalid_config("array dimension must be non-zero"));
    }
    if self.vector_width == 0 {
      return Err(ArrayError::invalid_config("vector width must be non-zero"));
    }
    Ok(())
  }

  /// Check an input bundle against this shape
  pub fn check_input(&self, input: &TickInput) -> Result<()> {
    self.check_operands(&input.a, &input.b)?;
    self.check_control("load", &input.load)?;
    if let Some(load_sum) = &input.load_sum {
      self.check_control("load_sum", load_sum)?;
    }
    if let Some(bias) = &input.bias {
      self.check_control("bias.enable", &bias.enable)?;
      check_grid(&bias.values, self.dim, |row, actual| ArrayError::ValueShape {
        signal: "bias.values",
        row,
        expected: self.dim,
        actual,
      })?;
    }
    Ok(())
  }

  fn check_operands(&self, a: &[Vec<i8>], b: &[Vec<i8>]) -> Result<()> {
    for (operand, grid) in [(Operand::A, a), (Operand::B, b)] {
      if grid.len() != self.dim {
        return Err(ArrayError::RowCount {
          operand,
          expected: self.dim,
          actual: grid.len(),
        });
      }
      if let Some((index, vector)) = grid.iter().enumerate().find(|(_, v)| v.len() != self.vector_width) {
        return Err(ArrayError::VectorWidth {
          operand,
          index,
          expected: self.vector_width,
          actual: vector.len(),
        });
      }
    }
    Ok(())
  }

  fn check_control(&self, signal: &'static str, grid: &[Vec<bool>]) -> Result<()> {
    check_grid(grid, self.dim, |row, actual| ArrayError::ControlShape {
      signal,
      row,
      expected: self.dim,
      actual,
    })
  }
}

impl Default for ArrayConfig {
  /// 4x4 array of 4-wide PEs with a 32-bit wrapping accumulator
  fn default() -> Self {
    Self {
      dim: 4,
      vector_width: 4,
      accumulator: AccumulatorFormat::default(),
    }
  }
}

/// Systolic tensor array
#[derive(Debug, Clone)]
pub struct SystolicTensorArray {
  config: ArrayConfig,
  /// 2D grid of processing elements
  pe_grid: Vec<Vec<ProcessingElement>>,
  /// Number of committed ticks
  cycle_count: u64,
}

impl SystolicTensorArray {
  pub fn new(config: ArrayConfig) -> Result<Self> {
    config.validate()?;

    let pe_grid = (0..config.dim)
      .map(|i| {
        (0..config.dim)
          .map(|j| ProcessingElement::new(i, j, config.vector_width))
          .collect()
      })
      .collect();

    Ok(Self {
      config,
      pe_grid,
      cycle_count: 0,
    })
  }

  /// Advance one clock edge with the core signals
  pub fn tick(&mut self, a: &[Vec<i8>], b: &[Vec<i8>], load: &[Vec<bool>], reset: bool) -> Result<()> {
    self.config.check_operands(a, b)?;
    self.config.check_control("load", load)?;

    let staged = self.stage(|i, j, _| PeControl::from_signals(load[i][j], reset), a, b)?;
    self.commit(staged);
    Ok(())
  }

  /// Advance one clock edge with the full input bundle, including preload controls
  pub fn step(&mut self, input: &TickInput) -> Result<()> {
    self.validate(input)?;

    let staged = self.stage(|i, j, grid| resolve_control(input, grid, i, j), &input.a, &input.b)?;
    self.commit(staged);
    Ok(())
  }

  /// Check an input bundle against the array shape without mutating anything
  pub fn validate(&self, input: &TickInput) -> Result<()> {
    self.config.check_input(input)
  }

  /// Current N x N accumulator grid
  pub fn outputs(&self) -> Grid<i64> {
    self
      .pe_grid
      .iter()
      .map(|row| row.iter().map(ProcessingElement::accumulator).collect())
      .collect()
  }

  pub fn phases(&self) -> Grid<PePhase> {
    self
      .pe_grid
      .iter()
      .map(|row| row.iter().map(ProcessingElement::phase).collect())
      .collect()
  }

  /// True once every cell has been reset or loaded at least once
  pub fn is_defined(&self) -> bool {
    self.pe_grid.iter().flatten().all(ProcessingElement::is_defined)
  }

  pub fn pe(&self, row: usize, col: usize) -> Option<&ProcessingElement> {
    self.pe_grid.get(row).and_then(|r| r.get(col))
  }

  pub fn config(&self) -> &ArrayConfig {
    &self.config
  }

  pub fn dim(&self) -> usize {
    self.config.dim
  }

  pub fn vector_width(&self) -> usize {
    self.config.vector_width
  }

  pub fn cycle_count(&self) -> u64 {
    self.cycle_count
  }

  /// Evaluate every cell against the current (pre-tick) grid
  fn stage<F>(&self, control: F, a: &[Vec<i8>], b: &[Vec<i8>]) -> Result<Vec<Vec<PeNext>>>
  where
    F: Fn(usize, usize, &[Vec<ProcessingElement>]) -> PeControl,
  {
    let fmt = &self.config.accumulator;
    self
      .pe_grid
      .iter()
      .enumerate()
      .map(|(i, row)| {
        row
          .iter()
          .enumerate()
          .map(|(j, pe)| pe.evaluate(&a[i], &b[j], control(i, j, self.pe_grid.as_slice()), fmt))
          .collect::<Result<Vec<_>>>()
      })
      .collect()
  }

  fn commit(&mut self, staged: Vec<Vec<PeNext>>) {
    for (row, next_row) in self.pe_grid.iter_mut().zip(staged) {
      for (pe, next) in row.iter_mut().zip(next_row) {
        pe.commit(next);
      }
    }
    self.cycle_count += 1;
  }
}

/// Pick the control for cell (i,j); `input` has already been validated
fn resolve_control(input: &TickInput, grid: &[Vec<ProcessingElement>], i: usize, j: usize) -> PeControl {
  if input.reset {
    return PeControl::Reset;
  }
  if let Some(bias) = &input.bias {
    if bias.enable[i][j] {
      return PeControl::Preload {
        value: bias.values[i][j],
        defined: true,
      };
    }
  }
  if let Some(load_sum) = &input.load_sum {
    if load_sum[i][j] {
      // Top edge has no northern neighbour and is tied to zero
      return match i.checked_sub(1).map(|north| &grid[north][j]) {
        Some(pe) => PeControl::Preload {
          value: pe.accumulator(),
          defined: pe.is_defined(),
        },
        None => PeControl::Preload { value: 0, defined: true },
      };
    }
  }
  PeControl::from_signals(input.load[i][j], false)
}

fn check_grid<T, E>(grid: &[Vec<T>], dim: usize, err: E) -> Result<()>
where
  E: Fn(Option<usize>, usize) -> ArrayError,
{
  if grid.len() != dim {
    return Err(err(None, grid.len()));
  }
  match grid.iter().position(|row| row.len() != dim) {
    Some(row) => Err(err(Some(row), grid[row].len())),
    None => Ok(()),
  }
}
