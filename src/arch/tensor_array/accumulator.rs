// Accumulator width and overflow handling shared by every PE and the reference model

use serde::{Deserialize, Serialize};

use crate::error::{ArrayError, Result};

/// Default accumulator width, matching the 32-bit `sum_out` register
pub const DEFAULT_ACC_BITS: u32 = 32;

/// What happens when a committed accumulator value leaves the representable range
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
  /// Two's-complement wraparound, keeping the low `bits` bits
  #[default]
  Wrap,
  /// Clamp to the signed range of `bits`
  Saturate,
}

impl std::str::FromStr for OverflowPolicy {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "wrap" => Ok(OverflowPolicy::Wrap),
      "saturate" => Ok(OverflowPolicy::Saturate),
      _ => Err(format!("Unknown overflow policy: {}", s)),
    }
  }
}

/// Fixed accumulator format
///
/// Dot products are computed exactly and only the committed value is reduced
/// into the format, so `Wrap` at 32 bits matches `i32` wrapping arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatorFormat {
  bits: u32,
  overflow: OverflowPolicy,
}

impl AccumulatorFormat {
  pub fn new(bits: u32, overflow: OverflowPolicy) -> Result<Self> {
    if !(2..=64).contains(&bits) {
      return Err(ArrayError::invalid_config(format!(
        "accumulator width must be in 2..=64 bits, got {}",
        bits
      )));
    }
    Ok(Self { bits, overflow })
  }

  pub fn bits(&self) -> u32 {
    self.bits
  }

  pub fn overflow(&self) -> OverflowPolicy {
    self.overflow
  }

  /// Smallest representable accumulator value
  pub fn min(&self) -> i64 {
    (-(1i128 << (self.bits - 1))) as i64
  }

  /// Largest representable accumulator value
  pub fn max(&self) -> i64 {
    ((1i128 << (self.bits - 1)) - 1) as i64
  }

  /// Reduce an exact value into the format
  pub fn reduce(&self, value: i128) -> i64 {
    match self.overflow {
      OverflowPolicy::Wrap => {
        let modulus = 1i128 << self.bits;
        let low = value.rem_euclid(modulus);
        if low >= modulus >> 1 {
          (low - modulus) as i64
        } else {
          low as i64
        }
      },
      OverflowPolicy::Saturate => value.clamp(self.min() as i128, self.max() as i128) as i64,
    }
  }

  /// prev + delta, reduced
  pub fn add(&self, prev: i64, delta: i64) -> i64 {
    self.reduce(prev as i128 + delta as i128)
  }
}

impl Default for AccumulatorFormat {
  fn default() -> Self {
    Self {
      bits: DEFAULT_ACC_BITS,
      overflow: OverflowPolicy::Wrap,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wrap_matches_i32() {
    let fmt = AccumulatorFormat::default();
    assert_eq!(fmt.add(i32::MAX as i64, 1), i32::MIN as i64);
    assert_eq!(fmt.add(i32::MIN as i64, -1), i32::MAX as i64);
    assert_eq!(fmt.add(100, -250), -150);
  }

  #[test]
  fn test_saturate_clamps() {
    let fmt = AccumulatorFormat::new(16, OverflowPolicy::Saturate).unwrap();
    assert_eq!(fmt.max(), i16::MAX as i64);
    assert_eq!(fmt.min(), i16::MIN as i64);
    assert_eq!(fmt.add(32_000, 16_129), i16::MAX as i64);
    assert_eq!(fmt.add(-32_000, -16_129), i16::MIN as i64);
  }

  #[test]
  fn test_full_width() {
    let fmt = AccumulatorFormat::new(64, OverflowPolicy::Wrap).unwrap();
    assert_eq!(fmt.add(i64::MAX, 1), i64::MIN);
    assert_eq!(fmt.min(), i64::MIN);
    assert_eq!(fmt.max(), i64::MAX);
  }

  #[test]
  fn test_rejects_bad_width() {
    assert!(AccumulatorFormat::new(1, OverflowPolicy::Wrap).is_err());
    assert!(AccumulatorFormat::new(65, OverflowPolicy::Wrap).is_err());
  }

  #[test]
  fn test_policy_parse() {
    assert_eq!("Saturate".parse::<OverflowPolicy>(), Ok(OverflowPolicy::Saturate));
    assert!("clip".parse::<OverflowPolicy>().is_err());
  }
}
