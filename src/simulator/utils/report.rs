use ::sim::models::{Model, Reportable};
use ::sim::simulator::Simulation;

use crate::arch::tensor_array::Grid;

pub fn print_simulation_records(simulation: &mut Simulation) {
  println!("\n--- Simulation Records ---");

  for model in simulation.models().iter() {
    print_model_records(model);
  }

  println!("--- End Records ---\n");
}

fn print_model_records(model: &Model) {
  let records = model.records();

  println!("\n[{}] {}", model.id(), model.status());
  for record in records {
    println!("  Time {:.1}: {} ({})", record.time, record.action, record.subject);
  }
}

/// Render an accumulator grid with right-aligned columns
pub fn format_grid(grid: &Grid<i64>) -> String {
  let width = grid
    .iter()
    .flatten()
    .map(|v| v.to_string().len())
    .max()
    .unwrap_or(1);

  grid
    .iter()
    .map(|row| {
      row
        .iter()
        .map(|v| format!("{:>width$}", v, width = width))
        .collect::<Vec<_>>()
        .join(" ")
    })
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn print_grid(label: &str, grid: &Grid<i64>) {
  println!("{}:\n{}", label, format_grid(grid));
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_grid() {
    let grid = vec![vec![1, -20], vec![300, 4]];
    assert_eq!(format_grid(&grid), "  1 -20\n300   4");
  }
}
