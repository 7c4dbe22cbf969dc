/// Skew buffers: per-channel delay lines that turn a vector into a diagonal
/// wavefront (input side) and back into an aligned vector (output side).
use super::grid::Drained;
use super::types::{Acc, Data, DumpBeat};
use crate::builtin::{Module, Wire};
use std::collections::VecDeque;

/// 固定深度的延迟线，深度0时直通
#[derive(Debug, Clone)]
pub struct DelayLine<T: Clone + Default> {
  stages: VecDeque<T>,
  depth: usize,
}

impl<T: Clone + Default> DelayLine<T> {
  pub fn new(depth: usize) -> Self {
    Self {
      stages: (0..depth).map(|_| T::default()).collect(),
      depth,
    }
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  /// 推入本拍输入，返回depth拍之前的输入
  pub fn step(&mut self, input: T) -> T {
    if self.depth == 0 {
      return input;
    }
    self.stages.push_back(input);
    self.stages.pop_front().unwrap_or_default()
  }

  pub fn reset(&mut self) {
    self.stages.iter_mut().for_each(|s| *s = T::default());
  }
}

/// 多通道延迟，每个通道深度独立
#[derive(Debug, Clone)]
pub struct SkewBuffer<T: Clone + Default> {
  channels: Vec<DelayLine<T>>,
}

impl<T: Clone + Default> SkewBuffer<T> {
  pub fn with_depths(depths: impl IntoIterator<Item = usize>) -> Self {
    Self {
      channels: depths.into_iter().map(DelayLine::new).collect(),
    }
  }

  /// 通道k延迟k拍
  pub fn ascending(channels: usize) -> Self {
    Self::with_depths(0..channels)
  }

  /// 通道j延迟 channels-1-j 拍
  pub fn descending(channels: usize) -> Self {
    Self::with_depths((0..channels).rev())
  }

  pub fn channels(&self) -> usize {
    self.channels.len()
  }

  pub fn depth(&self, channel: usize) -> usize {
    self.channels[channel].depth()
  }

  /// 缺少的输入按默认值（零气泡）处理
  pub fn step(&mut self, inputs: &[T]) -> Vec<T> {
    self
      .channels
      .iter_mut()
      .enumerate()
      .map(|(k, line)| line.step(inputs.get(k).cloned().unwrap_or_default()))
      .collect()
  }

  pub fn reset(&mut self) {
    self.channels.iter_mut().for_each(DelayLine::reset);
  }
}

/// 输入skew：激活存储读出的行向量 -> 对角波前
///
/// 输入端口本身就是一级寄存器；input无效时注入零气泡。
pub struct InputSkew {
  name: String,

  // 输入：激活存储读响应（ROWS个通道）
  pub input: Wire<Vec<Data>>,

  // 输出：送往阵列第0列，第r行延迟r拍
  pub output: Vec<Data>,

  lines: SkewBuffer<Data>,
}

impl InputSkew {
  pub fn new(name: impl Into<String>, rows: usize) -> Self {
    Self {
      name: name.into(),
      input: Wire::default(),
      output: vec![0; rows],
      lines: SkewBuffer::ascending(rows),
    }
  }

  pub fn depth(&self, channel: usize) -> usize {
    self.lines.depth(channel)
  }
}

impl Module for InputSkew {
  fn run(&mut self) {
    let bubble = Vec::new();
    let row = self.input.get().unwrap_or(&bubble);
    self.output = self.lines.step(row);
  }

  fn reset(&mut self) {
    self.input = Wire::default();
    self.output.fill(0);
    self.lines.reset();
  }

  fn name(&self) -> &str {
    &self.name
  }
}

/// 对齐后的一行排空结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignedRow {
  pub values: Vec<Acc>,
  pub beat: DumpBeat,
}

/// 输出de-skew：抵消排空控制在列方向上的逐列延迟
///
/// 第j列延迟 COLS-1-j 拍；有效位取第0列，经过 COLS-1 级流水。
pub struct OutputDeskew {
  name: String,

  // 输入：阵列底边每列的排空输出
  pub input: Vec<Wire<Drained>>,

  // 输出：同一拍对齐的一行
  pub output: Wire<AlignedRow>,

  lines: SkewBuffer<Acc>,
  valid: DelayLine<Wire<DumpBeat>>,
}

impl OutputDeskew {
  pub fn new(name: impl Into<String>, cols: usize) -> Self {
    Self {
      name: name.into(),
      input: vec![Wire::default(); cols],
      output: Wire::default(),
      lines: SkewBuffer::descending(cols),
      valid: DelayLine::new(cols.saturating_sub(1)),
    }
  }

  pub fn depth(&self, channel: usize) -> usize {
    self.lines.depth(channel)
  }

  /// 流水中还有未输出的有效拍
  pub fn is_busy(&self) -> bool {
    self.input.iter().any(|w| w.valid) || self.valid.stages.iter().any(|w| w.valid)
  }
}

impl Module for OutputDeskew {
  fn run(&mut self) {
    let values: Vec<Acc> = self.input.iter().map(|w| w.value_or_default().value).collect();
    let aligned = self.lines.step(&values);

    let head: Wire<DumpBeat> = self.input.first().and_then(|w| w.get()).map(|d| d.beat).into();
    let beat = self.valid.step(head);

    match beat.get() {
      Some(beat) => self.output.set(AlignedRow {
        values: aligned,
        beat: *beat,
      }),
      None => self.output.clear(),
    }
  }

  fn reset(&mut self) {
    self.input.iter_mut().for_each(|w| *w = Wire::default());
    self.output = Wire::default();
    self.lines.reset();
    self.valid.reset();
  }

  fn name(&self) -> &str {
    &self.name
  }
}
