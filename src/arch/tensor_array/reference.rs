// Golden model for checking the array tick by tick
//
// Row-major accumulators and no PE objects; only the accumulator format is
// shared with the array.

use super::array::ArrayConfig;
use super::signals::{Grid, TickInput};
use crate::error::Result;

/// Exact dot product, widened per element like the testbench `expected_dot`
pub fn expected_dot(a: &[i8], b: &[i8]) -> i64 {
  let mut acc = 0i64;
  for k in 0..a.len().min(b.len()) {
    acc += i64::from(a[k]) * i64::from(b[k]);
  }
  acc
}

/// C[i][j] = dot(A[i], B[j]) for every cell
pub fn expected_outputs(a: &[Vec<i8>], b: &[Vec<i8>]) -> Grid<i64> {
  a.iter()
    .map(|row| b.iter().map(|col| expected_dot(row, col)).collect())
    .collect()
}

/// One cell where model and array disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
  pub row: usize,
  pub col: usize,
  pub expected: i64,
  pub actual: i64,
}

/// Cell-by-cell comparison of two equally sized grids
pub fn compare(expected: &[Vec<i64>], actual: &[Vec<i64>]) -> Vec<Mismatch> {
  let mut mismatches = Vec::new();
  for (i, (exp_row, act_row)) in expected.iter().zip(actual.iter()).enumerate() {
    for (j, (&exp, &act)) in exp_row.iter().zip(act_row.iter()).enumerate() {
      if exp != act {
        mismatches.push(Mismatch {
          row: i,
          col: j,
          expected: exp,
          actual: act,
        });
      }
    }
  }
  mismatches
}

/// Flat reference accumulator grid
#[derive(Debug, Clone)]
pub struct ReferenceModel {
  config: ArrayConfig,
  acc: Vec<i64>,
}

impl ReferenceModel {
  pub fn new(config: ArrayConfig) -> Self {
    Self {
      config,
      acc: vec![0; config.dim * config.dim],
    }
  }

  /// Apply one tick; a misshapen input is rejected and leaves the model alone
  pub fn apply(&mut self, input: &TickInput) -> Result<Grid<i64>> {
    self.config.check_input(input)?;
    let n = self.config.dim;
    let fmt = &self.config.accumulator;
    let before = self.acc.clone();
    for i in 0..n {
      for j in 0..n {
        let idx = i * n + j;
        let bias = input.bias.as_ref().filter(|bias| bias.enable[i][j]).map(|bias| bias.values[i][j]);
        let chained = input.load_sum.as_ref().is_some_and(|mask| mask[i][j]);

        self.acc[idx] = if input.reset {
          0
        } else if let Some(value) = bias {
          fmt.reduce(value as i128)
        } else if chained {
          if i == 0 {
            0
          } else {
            before[idx - n]
          }
        } else if input.load[i][j] {
          fmt.reduce(expected_dot(&input.a[i], &input.b[j]) as i128)
        } else {
          fmt.add(before[idx], expected_dot(&input.a[i], &input.b[j]))
        };
      }
    }
    Ok(self.outputs())
  }

  pub fn outputs(&self) -> Grid<i64> {
    self.acc.chunks(self.config.dim).map(|row| row.to_vec()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arch::tensor_array::accumulator::AccumulatorFormat;
  use crate::arch::tensor_array::signals::BiasPreload;
  use crate::error::ArrayError;

  #[test]
  fn test_expected_outputs() {
    let a = vec![vec![1, 2, 3], vec![4, 5, 6]];
    let b = vec![vec![7, 9, 11], vec![8, 10, 12]];
    assert_eq!(expected_outputs(&a, &b), vec![vec![58, 64], vec![139, 154]]);
  }

  #[test]
  fn test_compare() {
    let expected = vec![vec![1, 2], vec![3, 4]];
    let actual = vec![vec![1, 2], vec![3, 5]];
    assert_eq!(
      compare(&expected, &actual),
      vec![Mismatch {
        row: 1,
        col: 1,
        expected: 4,
        actual: 5
      }]
    );
    assert!(compare(&expected, &expected).is_empty());
  }

  fn model(dim: usize, width: usize) -> ReferenceModel {
    ReferenceModel::new(ArrayConfig::new(dim, width, AccumulatorFormat::default()).unwrap())
  }

  #[test]
  fn test_reference_accumulates() {
    let mut model = model(2, 1);
    model.apply(&TickInput::reset(2, 1)).unwrap();
    let input = TickInput::compute(vec![vec![2], vec![3]], vec![vec![5], vec![7]]);
    model.apply(&input).unwrap();
    assert_eq!(model.apply(&input).unwrap(), vec![vec![20, 28], vec![30, 42]]);
  }

  #[test]
  fn test_reference_rejects_bad_shapes() {
    let mut model = model(2, 2);
    model.apply(&TickInput::reset(2, 2)).unwrap();

    let mut short_load = TickInput::compute(vec![vec![1, 1]; 2], vec![vec![1, 1]; 2]);
    short_load.load = vec![vec![false]; 2];
    assert!(matches!(
      model.apply(&short_load),
      Err(ArrayError::ControlShape { signal: "load", .. })
    ));

    let bias = BiasPreload {
      enable: vec![vec![true; 2]; 2],
      values: vec![vec![1; 2]],
    };
    assert!(model.apply(&TickInput::zeros(2, 2).with_bias(bias)).is_err());
    assert!(model.apply(&TickInput::zeros(3, 2)).is_err());
    assert!(model.apply(&TickInput::zeros(2, 1)).is_err());
    assert_eq!(model.outputs(), vec![vec![0; 2]; 2]);
  }
}
