// Per-tick input and output bundles driven across the array boundary

use serde::{Deserialize, Serialize};

/// One signed 8-bit operand vector (one row of A or one column of B)
pub type Vector = Vec<i8>;

/// Row-major 2D grid
pub type Grid<T> = Vec<Vec<T>>;

/// Bias preload: overwrite enabled cells with a fixed value instead of a MAC result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasPreload {
  /// N x N per-cell enable (`load_bias`)
  pub enable: Grid<bool>,
  /// N x N bias values
  pub values: Grid<i64>,
}

impl BiasPreload {
  /// Enable bias preload on every cell
  pub fn all(values: Grid<i64>) -> Self {
    let enable = values.iter().map(|row| vec![true; row.len()]).collect();
    Self { enable, values }
  }
}

/// Everything the array samples on one clock edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
  /// N x W, row i feeds PE row i
  pub a: Grid<i8>,
  /// N x W, row j feeds PE column j
  pub b: Grid<i8>,
  /// N x N, overwrite the accumulator with this cycle's dot product
  pub load: Grid<bool>,
  /// Global reset, highest priority
  #[serde(default)]
  pub reset: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bias: Option<BiasPreload>,
  /// N x N, take the northern neighbour's pre-tick accumulator (row 0 takes 0)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub load_sum: Option<Grid<bool>>,
}

impl TickInput {
  pub fn new(a: Grid<i8>, b: Grid<i8>, load: Grid<bool>, reset: bool) -> Self {
    Self {
      a,
      b,
      load,
      reset,
      bias: None,
      load_sum: None,
    }
  }

  /// Operands with every load deasserted
  pub fn compute(a: Grid<i8>, b: Grid<i8>) -> Self {
    let n = a.len();
    Self::new(a, b, vec![vec![false; n]; n], false)
  }

  /// Zero operands, no load, reset asserted
  pub fn reset(dim: usize, vector_width: usize) -> Self {
    let mut input = Self::zeros(dim, vector_width);
    input.reset = true;
    input
  }

  /// Zero operands with nothing asserted; ticking with this leaves every accumulator unchanged
  pub fn zeros(dim: usize, vector_width: usize) -> Self {
    Self::new(
      vec![vec![0; vector_width]; dim],
      vec![vec![0; vector_width]; dim],
      vec![vec![false; dim]; dim],
      false,
    )
  }

  pub fn with_bias(mut self, bias: BiasPreload) -> Self {
    self.bias = Some(bias);
    self
  }

  pub fn with_load_sum(mut self, load_sum: Grid<bool>) -> Self {
    self.load_sum = Some(load_sum);
    self
  }

  pub fn dim(&self) -> usize {
    self.a.len()
  }
}

/// Accumulator grid sampled after a committed tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFrame {
  /// Number of ticks committed so far, this one included
  pub cycle: u64,
  pub outputs: Grid<i64>,
}

/// N x N grid with every cell set
pub fn filled<T: Clone>(dim: usize, value: T) -> Grid<T> {
  vec![vec![value; dim]; dim]
}

/// N x N grid with only the diagonal set
pub fn diagonal(dim: usize) -> Grid<bool> {
  (0..dim).map(|i| (0..dim).map(|j| i == j).collect()).collect()
}

/// N x N grid with only row `row` set
pub fn row_mask(dim: usize, row: usize) -> Grid<bool> {
  (0..dim).map(|i| vec![i == row; dim]).collect()
}
