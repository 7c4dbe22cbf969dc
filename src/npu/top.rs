/// Top Module - 连接存储、Sequencer、阵列、skew、PPU和输出队列
use super::bank::ColumnBank;
use super::grid::SystolicGrid;
use super::ppu::{Ppu, QuantParams};
use super::queue::OutputQueue;
use super::sequencer::{SeqState, Sequencer};
use super::skew::{InputSkew, OutputDeskew};
use super::store::VectorStore;
use super::types::{Acc, ArrayConfig, Command, Data};
use crate::builtin::{Module, Wire};
use crate::error::{Error, Result};
use crate::npu_record;
use crate::simulator::sim::records::NpuRecord;
use serde::Serialize;

/// 主机可见的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NpuStatus {
  pub cycle: u64,
  pub state: SeqState,
  pub busy: bool,
  /// 上一拍结束了一次运行
  pub done: bool,
  /// 已完成的运行次数
  pub runs_done: u64,
  pub out_valid: bool,
  pub queue_len: usize,
}

pub struct Npu {
  name: String,
  config: ArrayConfig,
  cycle: u64,

  sequencer: Sequencer,
  weight_store: VectorStore,
  act_store: VectorStore,
  input_skew: InputSkew,
  grid: SystolicGrid,
  deskew: OutputDeskew,
  bank: ColumnBank,
  ppu: Ppu,
  queue: OutputQueue,

  // PPU -> 输出队列
  queue_in: Wire<Vec<Data>>,

  // 外部消费者是否就绪
  out_ready: bool,
  // 已排空、尚未进入队列的向量
  in_flight: usize,

  done: bool,
  runs_done: u64,
  last_raw: Option<Vec<Acc>>,
  // run()中出现的不变量错误，由tick()取走
  fault: Option<Error>,

  // 只有打开记录时才保存事件，由take_records()取走
  pub(crate) recording: bool,
  pub(crate) records: Vec<NpuRecord>,
}

impl Npu {
  pub fn new(name: impl Into<String>, config: ArrayConfig) -> Result<Self> {
    config.validate()?;
    let (rows, cols) = (config.rows, config.cols);

    let mut npu = Self {
      name: name.into(),
      config,
      cycle: 0,
      sequencer: Sequencer::new("sequencer", &config),
      weight_store: VectorStore::new("weight_store", "weight", cols, config.weight_depth),
      act_store: VectorStore::new("act_store", "activation", rows, config.act_depth),
      input_skew: InputSkew::new("input_skew", rows),
      grid: SystolicGrid::new("grid", rows, cols, config.clear_on_load),
      deskew: OutputDeskew::new("output_deskew", cols),
      bank: ColumnBank::new("column_bank", cols),
      ppu: Ppu::new("ppu", QuantParams::default()),
      queue: OutputQueue::new(config.queue_depth),
      queue_in: Wire::default(),
      out_ready: true,
      in_flight: 0,
      done: false,
      runs_done: 0,
      last_raw: None,
      fault: None,
      recording: false,
      records: Vec::new(),
    };
    npu.update_ready();
    Ok(npu)
  }

  pub fn config(&self) -> &ArrayConfig {
    &self.config
  }

  pub fn cycle(&self) -> u64 {
    self.cycle
  }

  pub fn grid(&self) -> &SystolicGrid {
    &self.grid
  }

  pub fn sequencer(&self) -> &Sequencer {
    &self.sequencer
  }

  pub fn weight_store(&self) -> &VectorStore {
    &self.weight_store
  }

  pub fn act_store(&self) -> &VectorStore {
    &self.act_store
  }

  pub fn queue(&self) -> &OutputQueue {
    &self.queue
  }

  pub fn quant(&self) -> &QuantParams {
    self.ppu.params()
  }

  /// 最近一次排空的原始列和（量化前）
  pub fn last_raw(&self) -> Option<&[Acc]> {
    self.last_raw.as_deref()
  }

  pub fn status(&self) -> NpuStatus {
    NpuStatus {
      cycle: self.cycle,
      state: self.sequencer.state(),
      busy: self.sequencer.is_busy(),
      done: self.done,
      runs_done: self.runs_done,
      out_valid: !self.queue.is_empty(),
      queue_len: self.queue.len(),
    }
  }

  /// 没有运行，也没有任何数据还在流水线中
  pub fn is_quiescent(&self) -> bool {
    !self.sequencer.is_busy()
      && self.sequencer.cmd_in.is_none()
      && !self.grid.is_draining()
      && !self.deskew.is_busy()
      && !self.bank.is_busy()
      && !self.ppu.is_busy()
      && !self.queue_in.valid
  }

  pub fn push_weights(&mut self, row: &[Data]) -> Result<()> {
    self.weight_store.push(row)
  }

  pub fn push_activations(&mut self, vector: &[Data]) -> Result<()> {
    self.act_store.push(vector)
  }

  /// 按装载顺序写入一个 ROWS x COLS 权重块：最底行先写
  pub fn push_weight_tile(&mut self, tile: &[Vec<Data>]) -> Result<()> {
    if tile.len() != self.config.rows {
      return Err(Error::LaneMismatch {
        what: "weight tile rows",
        expected: self.config.rows,
        got: tile.len(),
      });
    }
    tile.iter().rev().try_for_each(|row| self.weight_store.push(row))
  }

  /// 下发命令；START/CLEAR在下一拍由Sequencer处理，忙时被忽略
  pub fn issue(&mut self, cmd: Command) {
    match cmd {
      Command::ResetWritePointers { weights, activations } => {
        if weights {
          self.weight_store.reset_write_ptr();
        }
        if activations {
          self.act_store.reset_write_ptr();
        }
        npu_record!(self, "reset_wr", format!("weights={} activations={}", weights, activations));
      },
      cmd => {
        if let Some(prev) = self.sequencer.cmd_in.replace(cmd) {
          log::warn!("{}: {:?} overwritten before it was sampled", self.name, prev);
        }
      },
    }
  }

  /// 量化参数只能在两次运行之间修改
  pub fn set_quant(&mut self, params: QuantParams) -> Result<()> {
    params.validate(self.config.cols)?;
    if !self.is_quiescent() {
      return Err(Error::Busy {
        what: "quantization parameters can only change between runs",
      });
    }
    npu_record!(self, "quant", format!("{:?}", params));
    self.ppu.set_params(params);
    Ok(())
  }

  pub fn set_out_ready(&mut self, ready: bool) {
    self.out_ready = ready;
    self.update_ready();
  }

  pub fn pop_output(&mut self) -> Option<Vec<Data>> {
    let vector = self.queue.pop();
    self.update_ready();
    vector
  }

  /// 打开或关闭事件记录；关闭时丢弃尚未取走的记录
  pub fn set_recording(&mut self, on: bool) {
    self.recording = on;
    if !on {
      self.records.clear();
    }
  }

  pub fn is_recording(&self) -> bool {
    self.recording
  }

  /// 取走并清空事件记录
  pub fn take_records(&mut self) -> Vec<NpuRecord> {
    std::mem::take(&mut self.records)
  }

  fn update_ready(&mut self) {
    self.sequencer.ready_in = self.out_ready && self.queue.len() + self.in_flight < self.queue.capacity();
  }

  /// 推进一个时钟沿；输出队列溢出时返回错误
  pub fn tick(&mut self) -> Result<()> {
    self.run();
    match self.fault.take() {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }

  pub fn tick_n(&mut self, n: u64) -> Result<()> {
    for _ in 0..n {
      self.tick()?;
    }
    Ok(())
  }
}

impl Module for Npu {
  fn run(&mut self) {
    let state_before = self.sequencer.state();
    if let Some(cmd) = self.sequencer.cmd_in {
      let action = if self.sequencer.is_busy() { "ignore" } else { "accept" };
      npu_record!(self, action, format!("{:?}", cmd));
    }

    // 从后向前运行：每个模块只读取上周期锁存的输入
    let pushed = match self.queue_in.get() {
      Some(vector) => {
        if let Err(e) = self.queue.push(vector.clone()) {
          log::error!("{}: cycle {} {}", self.name, self.cycle, e);
          self.fault = Some(e);
          return;
        }
        npu_record!(self, "push", format!("{:?}", vector));
        true
      },
      None => false,
    };
    self.ppu.run();
    self.bank.run();
    self.deskew.run();
    self.grid.run();
    self.input_skew.run();
    self.act_store.run();
    self.weight_store.run();
    self.sequencer.run();

    // 连线更新：本周期的输出 -> 下周期的输入
    self.queue_in = self.ppu.output.clone();
    self.ppu.input = self.bank.output.clone();
    if let Some(raw) = self.bank.output.get() {
      self.last_raw = Some(raw.clone());
    }
    self.bank.input = self.deskew.output.clone();
    self.deskew.input = self.grid.bottom_out.clone();
    self.grid.act_in = self.input_skew.output.clone();
    self.grid.weight_in = self.weight_store.read_resp.clone();
    self.grid.clear_in = self.sequencer.output.clear;
    self.grid.dump_in = self.sequencer.output.dump.clone();
    self.input_skew.input = self.act_store.read_resp.clone();
    self.act_store.read_req = self.sequencer.output.act_read.clone();
    self.weight_store.read_req = self.sequencer.output.weight_read.clone();

    if self.sequencer.output.drained {
      self.in_flight += 1;
    }
    if pushed {
      self.in_flight = self.in_flight.saturating_sub(1);
    }
    self.update_ready();

    self.done = self.sequencer.output.done;
    if self.done {
      self.runs_done += 1;
    }
    let state_after = self.sequencer.state();
    if state_after != state_before {
      log::debug!("{}: cycle {} {:?} -> {:?}", self.name, self.cycle, state_before, state_after);
      npu_record!(self, "state", format!("{:?} -> {:?}", state_before, state_after));
    }

    self.cycle += 1;
  }

  /// 回到上电状态，存储内容一并清零
  fn reset(&mut self) {
    self.sequencer.reset();
    self.weight_store.reset();
    self.act_store.reset();
    self.input_skew.reset();
    self.grid.reset();
    self.deskew.reset();
    self.bank.reset();
    self.ppu.reset();
    self.queue.clear();
    self.queue_in = Wire::default();
    self.in_flight = 0;
    self.done = false;
    self.runs_done = 0;
    self.last_raw = None;
    self.fault = None;
    self.records.clear();
    self.cycle = 0;
    self.update_ready();
  }

  fn name(&self) -> &str {
    &self.name
  }
}
