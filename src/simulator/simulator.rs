use super::config::AppConfig;
use super::driver::Driver;
use super::sim::mode::SimConfig;
use super::sim::SimClock;
use super::utils::log::set_quiet;
use super::utils::report::RunSummary;
use super::workload::Workload;
use crate::error::{Error, Result};
use crate::npu::reference;
use crate::npu::Npu;
use std::path::Path;

pub struct Simulator {
  app: AppConfig,
  config: SimConfig,
  npu: Npu,
  clock: SimClock,
}

impl Simulator {
  pub fn new(app: AppConfig) -> Result<Self> {
    let config = SimConfig::from(&app);
    set_quiet(config.quiet);

    app.quant.validate(app.array.cols)?;
    let mut npu = Npu::new("npu", app.array)?;
    npu.set_recording(true);
    let clock = SimClock::new(config.step_mode, config.trace_file.as_deref())?;

    log::info!(
      "NPU {}x{} (queue depth {}), step mode {:?}",
      app.array.rows,
      app.array.cols,
      app.array.queue_depth,
      config.step_mode
    );

    Ok(Self { app, config, npu, clock })
  }

  pub fn npu(&self) -> &Npu {
    &self.npu
  }

  pub fn clock(&self) -> &SimClock {
    &self.clock
  }

  /// 运行配置中指定的工作负载文件
  pub fn run(&mut self) -> Result<RunSummary> {
    if self.app.simulation.workload.is_empty() {
      return Err(Error::invalid_config("no workload given (use --workload or simulation.workload)"));
    }
    let workload = Workload::load(Path::new(&self.app.simulation.workload))?;
    self.run_workload(&workload)
  }

  /// 逐个输入向量运行，并与参考模型逐位比较
  pub fn run_workload(&mut self, workload: &Workload) -> Result<RunSummary> {
    workload.validate()?;
    let quant = workload.quant_params(&self.app.quant);
    quant.validate(workload.n())?;

    let start_cycle = self.npu.cycle();
    let start_runs = self.npu.status().runs_done;
    let mut outputs = Vec::with_capacity(workload.inputs.len());
    let mut predictions = Vec::with_capacity(workload.inputs.len());

    let mut driver = Driver::new(&mut self.npu, &mut self.clock, self.config.max_cycles);
    for (index, x) in workload.inputs.iter().enumerate() {
      let got = driver.matvec(x, &workload.weights, &quant)?;

      let expected = reference::matvec(x, &workload.weights, &quant);
      if got != expected {
        return Err(Error::Mismatch { index, got, expected });
      }
      if let Some(expected) = workload.expected.get(index) {
        if &got != expected {
          return Err(Error::Mismatch {
            index,
            got,
            expected: expected.clone(),
          });
        }
      }

      match (reference::argmax(&got), workload.labels.get(index)) {
        (Some(class), Some(label)) => {
          log::info!("y[{}] = {:?} class {} label {}", index, got, class, label);
          predictions.push(class);
        },
        (Some(class), None) => {
          log::info!("y[{}] = {:?} class {}", index, got, class);
          predictions.push(class);
        },
        (None, _) => log::info!("y[{}] = {:?}", index, got),
      }
      outputs.push(got);
    }

    let correct = (!workload.labels.is_empty()).then(|| {
      predictions
        .iter()
        .zip(&workload.labels)
        .filter(|(class, label)| class == label)
        .count()
    });

    Ok(RunSummary {
      workload: workload.name.clone(),
      outputs,
      predictions,
      correct,
      cycles: self.npu.cycle() - start_cycle,
      runs: self.npu.status().runs_done - start_runs,
      records: self.clock.records().len(),
    })
  }
}
