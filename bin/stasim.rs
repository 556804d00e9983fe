use clap::Parser;
use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};
use stasim::arch::tensor_array::signals::{diagonal, filled};
use stasim::arch::tensor_array::{OverflowPolicy, TickInput};
use stasim::simulator::config::config::{apply_cli_overrides, load_config, CliOverrides};
use stasim::simulator::sim::stimulus::load_stimulus;
use stasim::simulator::utils::log::{init_log_with_level, level_for};
use stasim::simulator::utils::report::print_grid;
use stasim::simulator::Simulator;

/// stasim - systolic tensor array simulator
#[derive(Parser, Debug)]
#[command(name = "stasim")]
#[command(version = "0.1.0")]
#[command(about = "Cycle-level systolic tensor array simulator", long_about = None)]
struct Args {
  /// Configuration file layered over the built-in defaults
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// JSON-lines stimulus file (a built-in demo runs when omitted)
  #[arg(long, value_name = "FILE")]
  stimulus: Option<String>,

  /// Enable step mode (interactive stepping)
  #[arg(short, long)]
  step: bool,

  /// Quiet mode (suppress log messages below warn)
  #[arg(short, long)]
  quiet: bool,

  /// Output trace file path
  #[arg(long, value_name = "FILE")]
  trace_file: Option<String>,

  /// Skip the per-tick reference model check
  #[arg(long)]
  no_check: bool,

  /// Array dimension N
  #[arg(long, value_name = "N")]
  dim: Option<usize>,

  /// Operand vector width W
  #[arg(long, value_name = "W")]
  vector_width: Option<usize>,

  /// Accumulator width in bits
  #[arg(long, value_name = "BITS")]
  acc_bits: Option<u32>,

  /// Accumulator overflow policy: wrap or saturate
  #[arg(long, value_name = "POLICY")]
  overflow: Option<OverflowPolicy>,

  /// Print the effective configuration and exit
  #[arg(long)]
  print_config: bool,
}

/// Reset, load A x B^T everywhere, then hold the operands on the diagonal for three ticks
fn demo_stimulus(dim: usize, width: usize) -> Vec<TickInput> {
  let a: Vec<Vec<i8>> = (0..dim)
    .map(|i| (0..width).map(|k| ((i * width + k) % 16 + 1) as i8).collect())
    .collect();
  let b: Vec<Vec<i8>> = (0..dim)
    .map(|j| (0..width).map(|k| (16 - (j * width + k) % 16) as i8).collect())
    .collect();

  let mut ticks = vec![
    TickInput::reset(dim, width),
    TickInput::new(a.clone(), b.clone(), filled(dim, true), false),
  ];
  for _ in 0..3 {
    ticks.push(TickInput::new(a.clone(), b.clone(), diagonal(dim), false));
  }
  ticks
}

fn main() -> io::Result<()> {
  let args = Args::parse();

  let mut app_config = load_config(args.config.as_deref())?;
  let cli = CliOverrides {
    quiet: args.quiet,
    step: args.step,
    check: args.no_check.then_some(false),
    trace_file: args.trace_file,
    stimulus: args.stimulus,
    dim: args.dim,
    vector_width: args.vector_width,
    acc_bits: args.acc_bits,
    overflow: args.overflow,
  };
  apply_cli_overrides(&mut app_config, &cli);

  // Quiet may come from the CLI, the config file or the environment
  init_log_with_level(level_for(app_config.simulation.quiet));

  if args.print_config {
    print!("{}", app_config.to_toml()?);
    return Ok(());
  }

  let ticks = match &app_config.simulation.stimulus {
    Some(path) => load_stimulus(Path::new(path))?,
    None => {
      info!("no stimulus given, running built-in demo");
      demo_stimulus(app_config.array.dim, app_config.array.vector_width)
    },
  };

  let mut simulator = Simulator::from_app_config(&app_config)?;
  let summary = simulator.run(&ticks)?;

  if !app_config.simulation.quiet {
    print_grid(&format!("outputs after {} ticks", summary.ticks), &summary.outputs);
  }

  if summary.mismatches > 0 {
    warn!("{} cells disagreed with the reference model", summary.mismatches);
    return Err(io::Error::new(
      io::ErrorKind::Other,
      format!("{} reference mismatches", summary.mismatches),
    ));
  }
  Ok(())
}
