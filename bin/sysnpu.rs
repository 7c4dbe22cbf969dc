use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use sysnpu::simulator::config::{load_and_merge_configs, CliOverrides};
use sysnpu::simulator::utils::log::init_log;
use sysnpu::simulator::utils::report::{print_simulation_records, print_summary};
use sysnpu::simulator::Simulator;

/// sysnpu - cycle-accurate systolic-array NPU simulator
#[derive(Parser, Debug)]
#[command(name = "sysnpu")]
#[command(version = "0.1.0")]
#[command(about = "Cycle-accurate model of a weight-stationary systolic NPU", long_about = None)]
struct Args {
  /// Configuration file (TOML), layered over the built-in defaults
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Workload file (TOML) to run
  #[arg(short, long, value_name = "FILE")]
  workload: Option<String>,

  /// Enable step mode (interactive stepping)
  #[arg(short, long)]
  step: bool,

  /// Quiet mode (suppress log messages)
  #[arg(short, long)]
  quiet: bool,

  /// Output trace file path (JSON lines)
  #[arg(long, value_name = "FILE")]
  trace_file: Option<String>,

  /// Array rows
  #[arg(long)]
  rows: Option<usize>,

  /// Array columns
  #[arg(long)]
  cols: Option<usize>,

  /// Cycle budget per wait before the run is reported as stalled
  #[arg(long)]
  max_cycles: Option<u64>,

  /// Print every recorded event after the run
  #[arg(long)]
  records: bool,
}

fn main() -> ExitCode {
  init_log();

  let args = Args::parse();

  let cli = CliOverrides {
    quiet: args.quiet,
    step: args.step,
    trace_file: args.trace_file,
    workload: args.workload,
    rows: args.rows,
    cols: args.cols,
    max_cycles: args.max_cycles,
  };

  let result = load_and_merge_configs(args.config.as_deref(), &cli)
    .and_then(Simulator::new)
    .and_then(|mut simulator| {
      let summary = simulator.run()?;
      if args.records {
        print_simulation_records(simulator.clock().records());
      }
      Ok(summary)
    });

  match result {
    Ok(summary) => {
      print_summary(&summary);
      ExitCode::SUCCESS
    },
    Err(e) => {
      log::error!("{}", e);
      ExitCode::FAILURE
    },
  }
}
