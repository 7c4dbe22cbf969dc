/// Sequencer - control FSM of one run: IDLE -> [LOAD] -> COMPUTE -> DRAIN -> IDLE
use super::types::{ArrayConfig, Command, DumpBeat, ReadReq, RunDescriptor};
use crate::builtin::{Module, Wire};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SeqState {
  #[default]
  Idle,
  Load,
  Compute,
  Drain,
}

/// 本拍发出的控制信号
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeqOutput {
  pub weight_read: Wire<ReadReq>,
  pub act_read: Wire<ReadReq>,
  /// 累加器清零脉冲
  pub clear: bool,
  pub dump: Wire<DumpBeat>,
  /// 运行结束脉冲
  pub done: bool,
  /// 本拍完成了一次排空（输出向量随后进入队列）
  pub drained: bool,
}

pub struct Sequencer {
  name: String,
  rows: u64,
  latency: u64,
  drain_beats: u64,
  // 最后一个排空节拍还要送入阵列并横穿COLS-1列
  drain_tail: u64,
  weight_depth: usize,
  act_depth: usize,

  // 输入：主机命令脉冲，只在IDLE时生效，run时被消耗
  pub cmd_in: Option<Command>,

  // 输入：输出侧可以接收
  pub ready_in: bool,

  // 输出
  pub output: SeqOutput,

  state: SeqState,
  counter: u64,
  run: RunDescriptor,
  weight_rd_ptr: usize,
  act_rd_ptr: usize,
}

impl Sequencer {
  pub fn new(name: impl Into<String>, cfg: &ArrayConfig) -> Self {
    Self {
      name: name.into(),
      rows: cfg.rows as u64,
      latency: u64::from(cfg.pipeline_latency()),
      drain_beats: u64::from(cfg.drain_beats()),
      drain_tail: u64::from(cfg.drain_tail()),
      weight_depth: cfg.weight_depth,
      act_depth: cfg.act_depth,
      cmd_in: None,
      ready_in: true,
      output: SeqOutput::default(),
      state: SeqState::Idle,
      counter: 0,
      run: RunDescriptor::default(),
      weight_rd_ptr: 0,
      act_rd_ptr: 0,
    }
  }

  pub fn state(&self) -> SeqState {
    self.state
  }

  pub fn is_busy(&self) -> bool {
    self.state != SeqState::Idle
  }

  pub fn counter(&self) -> u64 {
    self.counter
  }

  pub fn current_run(&self) -> &RunDescriptor {
    &self.run
  }

  pub fn weight_rd_ptr(&self) -> usize {
    self.weight_rd_ptr
  }

  pub fn act_rd_ptr(&self) -> usize {
    self.act_rd_ptr
  }

  fn start(&mut self, run: RunDescriptor, out: &mut SeqOutput) {
    if run.reset_weight_read {
      self.weight_rd_ptr = 0;
    }
    if run.reset_act_read {
      self.act_rd_ptr = 0;
    }
    out.clear = run.clear;
    self.run = run;
    self.counter = 0;
    self.state = if run.load_weights {
      SeqState::Load
    } else {
      SeqState::Compute
    };
    log::debug!("{}: start {:?} -> {:?}", self.name, run, self.state);
  }

  fn step_load(&mut self, out: &mut SeqOutput) {
    out.weight_read.set(ReadReq {
      addr: self.weight_rd_ptr,
    });
    self.weight_rd_ptr = (self.weight_rd_ptr + 1) % self.weight_depth;
    self.counter += 1;
    if self.counter == self.rows {
      self.counter = 0;
      self.state = SeqState::Compute;
    }
  }

  fn step_compute(&mut self, out: &mut SeqOutput) {
    let run_size = u64::from(self.run.run_size);
    if self.counter < run_size {
      out.act_read.set(ReadReq { addr: self.act_rd_ptr });
      self.act_rd_ptr = (self.act_rd_ptr + 1) % self.act_depth;
    }
    self.counter += 1;

    // 最后一个激活穿过整个阵列之后才能结束
    if self.counter == run_size + self.latency {
      self.counter = 0;
      if self.run.no_drain {
        out.done = true;
        self.state = SeqState::Idle;
      } else {
        self.state = SeqState::Drain;
      }
    }
  }

  fn step_drain(&mut self, out: &mut SeqOutput) {
    if self.counter < self.drain_beats {
      // 反压：计数器停住，不发排空节拍，阵列保持
      if !self.ready_in {
        return;
      }
      self.counter += 1;
      let last = self.counter == self.drain_beats;
      out.dump.set(DumpBeat { last });
      out.drained = last;
    } else {
      // 节拍已全部发出，等它走完最右列；此时清零或装载会破坏未排出的部分和
      self.counter += 1;
    }

    if self.counter == self.drain_beats + self.drain_tail {
      self.counter = 0;
      out.done = true;
      self.state = SeqState::Idle;
    }
  }
}

impl Module for Sequencer {
  fn run(&mut self) {
    let mut out = SeqOutput::default();
    let cmd = self.cmd_in.take();

    match self.state {
      SeqState::Idle => match cmd {
        Some(Command::Start(run)) => self.start(run, &mut out),
        Some(Command::ClearAccumulators) => out.clear = true,
        Some(Command::ResetWritePointers { .. }) | None => {},
      },
      state => {
        if let Some(cmd) = cmd {
          log::warn!("{}: {:?} ignored while {:?}", self.name, cmd, state);
        }
        match state {
          SeqState::Load => self.step_load(&mut out),
          SeqState::Compute => self.step_compute(&mut out),
          SeqState::Drain => self.step_drain(&mut out),
          SeqState::Idle => {},
        }
      },
    }

    self.output = out;
  }

  fn reset(&mut self) {
    self.cmd_in = None;
    self.ready_in = true;
    self.output = SeqOutput::default();
    self.state = SeqState::Idle;
    self.counter = 0;
    self.run = RunDescriptor::default();
    self.weight_rd_ptr = 0;
    self.act_rd_ptr = 0;
  }

  fn name(&self) -> &str {
    &self.name
  }
}
