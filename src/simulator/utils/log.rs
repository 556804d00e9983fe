// Global logging setup
use log::LevelFilter;

/// Initialise `env_logger` at `info`; `RUST_LOG` overrides the level
pub fn init_log() {
  init_log_with_level(LevelFilter::Info);
}

/// Default level for a run; quiet runs only show warnings and errors
pub fn level_for(quiet: bool) -> LevelFilter {
  if quiet {
    LevelFilter::Warn
  } else {
    LevelFilter::Info
  }
}

/// Initialise `env_logger` at `level`; repeated calls are ignored
pub fn init_log_with_level(level: LevelFilter) {
  let _ = env_logger::Builder::new()
    .filter_level(level)
    .parse_default_env()
    .format_timestamp(None)
    .format_target(false)
    .try_init();
}
