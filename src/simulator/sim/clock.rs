use super::mode::StepMode;
use super::records::NpuRecord;
use super::shell::{Shell, ShellCommand};
use super::trace::TraceWriter;
use crate::error::{Error, Result};
use crate::npu::Npu;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// 驱动NPU时钟：连续运行或交互单步，并把事件写入trace
pub struct SimClock {
  step_mode: StepMode,
  shell: Option<Shell>,
  // 下次提示之前还能走的周期数
  remaining: u32,
  trace: Option<TraceWriter<BufWriter<File>>>,
  records: Vec<NpuRecord>,
}

impl SimClock {
  pub fn new(step_mode: StepMode, trace_file: Option<&Path>) -> Result<Self> {
    let shell = match step_mode {
      StepMode::Step => {
        println!("Step mode - Enter steps one cycle, 'si N' steps N, 'p' prints status, 'c' continues, 'q' quits");
        Some(Shell::new()?)
      },
      StepMode::Continuous => None,
    };
    let trace = trace_file
      .map(|path| TraceWriter::<BufWriter<File>>::create(path))
      .transpose()?;
    Ok(Self {
      step_mode,
      shell,
      remaining: 0,
      trace,
      records: Vec::new(),
    })
  }

  pub fn continuous() -> Self {
    Self {
      step_mode: StepMode::Continuous,
      shell: None,
      remaining: 0,
      trace: None,
      records: Vec::new(),
    }
  }

  pub fn records(&self) -> &[NpuRecord] {
    &self.records
  }

  fn prompt(&mut self, npu: &Npu) -> Result<()> {
    let Some(shell) = self.shell.as_mut() else {
      self.step_mode = StepMode::Continuous;
      return Ok(());
    };
    loop {
      match shell.read_command()? {
        ShellCommand::Step(n) => {
          self.remaining = n;
          return Ok(());
        },
        ShellCommand::Continue => {
          self.step_mode = StepMode::Continuous;
          return Ok(());
        },
        ShellCommand::Quit => return Err(Error::Aborted),
        ShellCommand::Print => {
          println!("{:?}", npu.status());
          println!("accumulators: {:?}", npu.grid().accumulators());
        },
      }
    }
  }

  /// 推进一个周期
  pub fn tick(&mut self, npu: &mut Npu) -> Result<()> {
    if self.step_mode == StepMode::Step && self.remaining == 0 {
      self.prompt(npu)?;
    }
    npu.tick()?;
    self.remaining = self.remaining.saturating_sub(1);

    let records = npu.take_records();
    if let Some(trace) = self.trace.as_mut() {
      trace.write_records(&records)?;
    }
    if self.step_mode == StepMode::Step {
      for record in &records {
        println!("[cycle {}] {} {}", record.cycle, record.action, record.subject);
      }
    }
    self.records.extend(records);
    Ok(())
  }
}
