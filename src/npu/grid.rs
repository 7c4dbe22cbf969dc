/// Systolic grid - ROWS x COLS MAC cells with nearest-neighbour links
///
/// 激活从第0列向右流动，权重在装载时从顶行向下移位，
/// 部分和在排空时向下移位（顶行注入0，底行输出）。
use super::mac::{CellControl, CellInputs, MacCell};
use super::types::{Acc, Data, DumpBeat};
use crate::builtin::{Module, Wire};

/// 底边排空出来的一个部分和
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
  pub value: Acc,
  pub beat: DumpBeat,
}

pub struct SystolicGrid {
  name: String,
  rows: usize,
  cols: usize,
  clear_on_load: bool,

  // 输入：左边沿激活（每行一个，已经过skew）
  pub act_in: Vec<Data>,

  // 输入：顶边权重，valid即装载
  pub weight_in: Wire<Vec<Data>>,

  // 输入：同步清零
  pub clear_in: bool,

  // 输入：排空节拍，先进入第0列
  pub dump_in: Wire<DumpBeat>,

  // 输出：底边每列的排空结果
  pub bottom_out: Vec<Wire<Drained>>,

  cells: Vec<Vec<MacCell>>,

  // 排空控制逐列右移，第c列比第0列晚c拍
  dump_cols: Vec<Wire<DumpBeat>>,
}

impl SystolicGrid {
  pub fn new(name: impl Into<String>, rows: usize, cols: usize, clear_on_load: bool) -> Self {
    Self {
      name: name.into(),
      rows,
      cols,
      clear_on_load,
      act_in: vec![0; rows],
      weight_in: Wire::default(),
      clear_in: false,
      dump_in: Wire::default(),
      bottom_out: vec![Wire::default(); cols],
      cells: vec![vec![MacCell::new(); cols]; rows],
      dump_cols: vec![Wire::default(); cols],
    }
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn cell(&self, row: usize, col: usize) -> &MacCell {
    &self.cells[row][col]
  }

  /// 所有单元累加器的快照（仅用于观察/调试）
  pub fn accumulators(&self) -> Vec<Vec<Acc>> {
    self
      .cells
      .iter()
      .map(|row| row.iter().map(MacCell::acc_out).collect())
      .collect()
  }

  pub fn weights(&self) -> Vec<Vec<Data>> {
    self
      .cells
      .iter()
      .map(|row| row.iter().map(MacCell::weight_out).collect())
      .collect()
  }

  /// 排空控制仍在阵列中传播（还有列没处理它）
  pub fn is_draining(&self) -> bool {
    self.dump_in.valid || self.dump_cols.iter().take(self.cols.saturating_sub(1)).any(|w| w.valid)
  }

  fn cell_inputs(&self, r: usize, c: usize) -> CellInputs {
    let act_in = if c == 0 {
      self.act_in.get(r).copied().unwrap_or(0)
    } else {
      self.cells[r][c - 1].act_out()
    };
    let (weight_in, acc_in) = if r == 0 {
      (self.weight_in.value.get(c).copied().unwrap_or(0), 0)
    } else {
      let above = &self.cells[r - 1][c];
      (above.weight_out(), above.acc_out())
    };
    CellInputs {
      act_in,
      weight_in,
      acc_in,
    }
  }
}

impl Module for SystolicGrid {
  fn run(&mut self) {
    // 本拍各列看到的排空控制
    let mut col_dump = Vec::with_capacity(self.cols);
    col_dump.push(self.dump_in.clone());
    col_dump.extend(self.dump_cols.iter().take(self.cols.saturating_sub(1)).cloned());

    // 先用旧寄存器算出全部下一状态，再整体提交
    let load = self.weight_in.valid;
    let mut next = self.cells.clone();
    for (r, next_row) in next.iter_mut().enumerate() {
      for (c, next_cell) in next_row.iter_mut().enumerate() {
        let ctl = CellControl {
          load,
          drain: col_dump[c].valid,
          clear: self.clear_in,
          clear_on_load: self.clear_on_load,
        };
        *next_cell = self.cells[r][c].next(self.cell_inputs(r, c), ctl);
      }
    }

    let bottom = self.rows - 1;
    for (c, out) in self.bottom_out.iter_mut().enumerate() {
      *out = col_dump[c]
        .get()
        .map(|beat| Drained {
          value: self.cells[bottom][c].acc_out(),
          beat: *beat,
        })
        .into();
    }

    self.cells = next;
    self.dump_cols = col_dump;
  }

  fn reset(&mut self) {
    self.act_in.fill(0);
    self.weight_in = Wire::default();
    self.clear_in = false;
    self.dump_in = Wire::default();
    self.bottom_out.iter_mut().for_each(|w| *w = Wire::default());
    self.cells.iter_mut().flatten().for_each(MacCell::reset);
    self.dump_cols.iter_mut().for_each(|w| *w = Wire::default());
  }

  fn name(&self) -> &str {
    &self.name
  }
}
