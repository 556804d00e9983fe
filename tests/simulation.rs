use stasim::arch::tensor_array::signals::{diagonal, filled};
use stasim::arch::tensor_array::{ArrayConfig, SystolicTensorArray, TickInput};
use log::LevelFilter;
use stasim::simulator::config::config::{load_config, AppConfig};
use stasim::simulator::sim::stimulus::load_stimulus;
use stasim::simulator::utils::log::{init_log, level_for};
use stasim::simulator::Simulator;
use stasim::{SimConfig, StepMode};
use std::fs;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
  std::env::temp_dir().join(format!("stasim_{}_{}", std::process::id(), name))
}

fn workload() -> Vec<TickInput> {
  let a: Vec<Vec<i8>> = vec![vec![1, -2, 3, -4], vec![5, 6, 7, 8], vec![-9, 10, -11, 12], vec![127, -128, 0, 1]];
  let b: Vec<Vec<i8>> = vec![vec![16, 15, 14, 13], vec![-12, 11, -10, 9], vec![8, 7, 6, 5], vec![-128, 3, 2, 1]];
  vec![
    TickInput::reset(4, 4),
    TickInput::new(a.clone(), b.clone(), filled(4, true), false),
    TickInput::new(a.clone(), b.clone(), diagonal(4), false),
    TickInput::compute(b.clone(), a.clone()),
    TickInput::zeros(4, 4),
    TickInput::new(a, b, filled(4, true), true),
  ]
}

#[test]
fn test_simulator_matches_direct_ticks() {
  init_log();
  let mut simulator = Simulator::new(SimConfig::default(), ArrayConfig::default()).unwrap();
  let mut direct = SystolicTensorArray::new(ArrayConfig::default()).unwrap();

  for (n, input) in workload().iter().enumerate() {
    let frame = simulator.tick(input).unwrap();
    direct.step(input).unwrap();
    assert_eq!(frame.cycle, n as u64 + 1);
    assert_eq!(frame.outputs, direct.outputs());
  }
  assert_eq!(simulator.mismatches(), 0);
  // One clock period per tick
  assert_eq!(simulator.global_time(), 6.0);
}

#[test]
fn test_run_reports_no_mismatches() {
  let mut simulator = Simulator::new(SimConfig::default(), ArrayConfig::default()).unwrap();
  let ticks = workload();
  let summary = simulator.run(&ticks[..5]).unwrap();
  assert_eq!(summary.ticks, 5);
  assert_eq!(summary.mismatches, 0);
  assert_eq!(summary.outputs, simulator.outputs());
}

#[test]
fn test_bad_shape_rejected_before_injection() {
  let mut simulator = Simulator::new(SimConfig::default(), ArrayConfig::default()).unwrap();
  simulator.tick(&TickInput::reset(4, 4)).unwrap();
  let err = simulator.tick(&TickInput::zeros(4, 3)).unwrap_err();
  assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);

  // The simulation is still usable afterwards
  let frame = simulator.tick(&TickInput::zeros(4, 4)).unwrap();
  assert_eq!(frame.cycle, 2);
}

#[test]
fn test_stimulus_file_and_trace() {
  let stimulus = temp_path("stimulus.jsonl");
  let trace = temp_path("trace.jsonl");
  fs::write(
    &stimulus,
    concat!(
      "# 2x2, width 1\n",
      "{\"a\":[[0],[0]],\"b\":[[0],[0]],\"load\":[[false,false],[false,false]],\"reset\":true}\n",
      "{\"a\":[[2],[3]],\"b\":[[5],[7]],\"load\":[[true,true],[true,true]]}\n",
      "{\"a\":[[2],[3]],\"b\":[[5],[7]],\"load\":[[false,false],[false,false]],\"repeat\":2}\n",
    ),
  )
  .unwrap();

  let mut app_config = AppConfig::default();
  app_config.array.dim = 2;
  app_config.array.vector_width = 1;
  app_config.simulation.trace_file = Some(trace.to_string_lossy().to_string());

  let ticks = load_stimulus(&stimulus).unwrap();
  assert_eq!(ticks.len(), 4);

  let mut simulator = Simulator::from_app_config(&app_config).unwrap();
  let summary = simulator.run(&ticks).unwrap();
  assert_eq!(summary.outputs, vec![vec![30, 42], vec![45, 63]]);
  assert_eq!(summary.mismatches, 0);
  drop(simulator);

  let lines: Vec<serde_json::Value> = fs::read_to_string(&trace)
    .unwrap()
    .lines()
    .map(|line| serde_json::from_str(line).unwrap())
    .collect();
  fs::remove_file(&stimulus).unwrap();
  fs::remove_file(&trace).unwrap();

  assert_eq!(lines.len(), 4);
  assert_eq!(lines[0]["reset"], true);
  assert_eq!(lines[1]["cycle"], 2);
  assert_eq!(lines[3]["outputs"][1][1], 63);
}

#[test]
fn test_step_mode_config() {
  let mut app_config = AppConfig::default();
  app_config.simulation.step_mode = true;
  let config = app_config.to_sim_config().unwrap();
  assert_eq!(config.step_mode, StepMode::Step);
}

#[test]
fn test_quiet_from_config_file() {
  let path = temp_path("quiet.toml");
  fs::write(&path, "[simulation]\nquiet = true\ncheck = false\n").unwrap();
  let app_config = load_config(Some(&path)).unwrap();
  fs::remove_file(&path).unwrap();

  assert_eq!(level_for(app_config.simulation.quiet), LevelFilter::Warn);
  let simulator = Simulator::from_app_config(&app_config).unwrap();
  assert!(simulator.config().quiet);
  assert!(!simulator.config().check);
}
