//! Error types for tensor array operations

use thiserror::Error;

/// Result type alias for tensor array operations
pub type Result<T> = std::result::Result<T, ArrayError>;

/// Operand side of the array a vector grid is injected on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
  /// Row vectors, entering along array rows
  A,
  /// Column vectors, entering along array columns
  B,
}

impl std::fmt::Display for Operand {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::A => write!(f, "A"),
      Operand::B => write!(f, "B"),
    }
  }
}

/// Caller-contract violations, rejected before any PE state changes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArrayError {
  /// Construction parameters out of range
  #[error("Invalid array configuration: {reason}")]
  InvalidConfig {
    /// What was wrong
    reason: String,
  },

  /// Operand grid has the wrong number of vectors
  #[error("Operand {operand} has {actual} vectors, expected {expected}")]
  RowCount {
    /// Which operand
    operand: Operand,
    /// Array dimension N
    expected: usize,
    /// Supplied vector count
    actual: usize,
  },

  /// One operand vector has the wrong width
  #[error("Operand {operand} vector {index} has width {actual}, expected {expected}")]
  VectorWidth {
    /// Which operand
    operand: Operand,
    /// Vector index within the operand grid
    index: usize,
    /// Configured vector width W
    expected: usize,
    /// Supplied width
    actual: usize,
  },

  /// A boolean control grid is not N x N
  #[error("Control grid '{signal}' row {row:?} has {actual} entries, expected {expected}")]
  ControlShape {
    /// Signal name (load, load_sum, bias.enable)
    signal: &'static str,
    /// Offending row, or `None` when the row count itself is wrong
    row: Option<usize>,
    /// Array dimension N
    expected: usize,
    /// Supplied length
    actual: usize,
  },

  /// The bias value grid is not N x N
  #[error("Value grid '{signal}' row {row:?} has {actual} entries, expected {expected}")]
  ValueShape {
    /// Signal name
    signal: &'static str,
    /// Offending row, or `None` when the row count itself is wrong
    row: Option<usize>,
    /// Array dimension N
    expected: usize,
    /// Supplied length
    actual: usize,
  },
}

impl ArrayError {
  /// Create an invalid configuration error
  pub fn invalid_config(reason: impl Into<String>) -> Self {
    Self::InvalidConfig { reason: reason.into() }
  }
}

impl From<ArrayError> for std::io::Error {
  fn from(err: ArrayError) -> Self {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_messages() {
    let err = ArrayError::VectorWidth {
      operand: Operand::B,
      index: 2,
      expected: 4,
      actual: 3,
    };
    assert_eq!(err.to_string(), "Operand B vector 2 has width 3, expected 4");

    let io_err: std::io::Error = ArrayError::invalid_config("dim must be non-zero").into();
    assert_eq!(io_err.kind(), std::io::ErrorKind::InvalidInput);
    assert!(io_err.to_string().contains("dim must be non-zero"));
  }
}
