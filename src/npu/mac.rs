/// MAC cell - one weight-stationary multiply-accumulate element
use super::types::{Acc, Data};
use serde::Serialize;

/// 单元的寄存器状态
///
/// 所有输出都是寄存器：`weight_out`/`act_out`/`acc_out` 总是比输入晚一拍。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MacCell {
  stored_weight: Data,
  act_reg: Data,
  acc_reg: Acc,
}

/// 来自左邻居（激活）、上邻居（权重/部分和）的输入
#[derive(Debug, Clone, Copy, Default)]
pub struct CellInputs {
  pub act_in: Data,
  pub weight_in: Data,
  pub acc_in: Acc,
}

/// 本拍的控制信号
#[derive(Debug, Clone, Copy, Default)]
pub struct CellControl {
  /// 权重装载：stored_weight <- weight_in
  pub load: bool,
  /// 排空：acc_reg <- acc_in
  pub drain: bool,
  /// 同步清零累加器，优先级最高
  pub clear: bool,
  /// 装载时同时清零act/acc
  pub clear_on_load: bool,
}

impl MacCell {
  pub fn new() -> Self {
    Self::default()
  }

  /// 以当前寄存器计算下一拍状态，不修改自身
  pub fn next(&self, input: CellInputs, ctl: CellControl) -> MacCell {
    let mut next = *self;
    next.act_reg = input.act_in;

    let load_clear = ctl.load && ctl.clear_on_load;
    if ctl.load {
      next.stored_weight = input.weight_in;
      if ctl.clear_on_load {
        next.act_reg = 0;
      }
    }

    next.acc_reg = if ctl.clear || load_clear {
      0
    } else if ctl.drain {
      input.acc_in
    } else {
      // 32位回绕，与硬件累加器一致
      self
        .acc_reg
        .wrapping_add(Acc::from(input.act_in) * Acc::from(self.stored_weight))
    };

    next
  }

  /// 向下传递的权重：装载前的旧值
  pub fn weight_out(&self) -> Data {
    self.stored_weight
  }

  pub fn act_out(&self) -> Data {
    self.act_reg
  }

  pub fn acc_out(&self) -> Acc {
    self.acc_reg
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }
}
