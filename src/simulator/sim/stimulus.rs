use serde::Deserialize;
use std::fs;
use std::io::{self, Result};
use std::path::Path;

use crate::arch::tensor_array::TickInput;

/// One stimulus line: a tick input, optionally issued several times in a row
#[derive(Debug, Deserialize)]
struct StimulusLine {
  #[serde(flatten)]
  input: TickInput,
  #[serde(default = "default_repeat")]
  repeat: u32,
}

fn default_repeat() -> u32 {
  1
}

/// Upper bound on `repeat` for a single line
pub const MAX_REPEAT: u32 = 1 << 16;

/// Parse JSON-lines stimulus text into the expanded tick sequence
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_stimulus(text: &str) -> Result<Vec<TickInput>> {
  let mut ticks = Vec::new();
  for (lineno, line) in text.lines().enumerate() {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
      continue;
    }
    let parsed: StimulusLine = serde_json::from_str(trimmed).map_err(|e| {
      io::Error::new(
        io::ErrorKind::InvalidData,
        format!("stimulus line {}: {}", lineno + 1, e),
      )
    })?;
    if parsed.repeat > MAX_REPEAT {
      return Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!(
          "stimulus line {}: repeat {} exceeds the limit of {}",
          lineno + 1,
          parsed.repeat,
          MAX_REPEAT
        ),
      ));
    }
    for _ in 0..parsed.repeat {
      ticks.push(parsed.input.clone());
    }
  }
  Ok(ticks)
}

pub fn load_stimulus(path: &Path) -> Result<Vec<TickInput>> {
  let content = fs::read_to_string(path)
    .map_err(|e| io::Error::new(e.kind(), format!("cannot read stimulus file {:?}: {}", path, e)))?;
  parse_stimulus(&content)
}
