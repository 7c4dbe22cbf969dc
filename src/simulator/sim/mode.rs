use crate::simulator::config::config::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
  Continuous,
  Step,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
  pub quiet: bool,
  pub step_mode: StepMode,
  pub trace_file: Option<PathBuf>,
  pub max_cycles: u64,
}

impl From<&AppConfig> for SimConfig {
  fn from(config: &AppConfig) -> Self {
    let sim = &config.simulation;
    Self {
      quiet: sim.quiet,
      step_mode: if sim.step_mode {
        StepMode::Step
      } else {
        StepMode::Continuous
      },
      trace_file: if sim.trace_file.is_empty() {
        None
      } else {
        Some(PathBuf::from(&sim.trace_file))
      },
      max_cycles: sim.max_cycles,
    }
  }
}
