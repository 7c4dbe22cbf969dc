/// Shared signal and descriptor types of the NPU datapath
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 8位有符号操作数（权重/激活）
pub type Data = i8;
/// 32位有符号累加器
pub type Acc = i32;

/// 存储读请求
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadReq {
  pub addr: usize,
}

/// 一拍排空控制，`last` 标记本次排空的最后一拍
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DumpBeat {
  pub last: bool,
}

/// 一次运行的描述符，START时由Sequencer锁存
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDescriptor {
  /// 本次流入的激活向量个数
  pub run_size: u32,
  /// 开始前清零累加器；为false时在驻留的部分和上继续累加
  pub clear: bool,
  /// 计算结束后不排空，部分和留在阵列中
  pub no_drain: bool,
  pub reset_weight_read: bool,
  pub reset_act_read: bool,
  /// 计算前先从权重存储装载ROWS行权重
  pub load_weights: bool,
}

impl RunDescriptor {
  /// 清零后计算并排空
  pub fn new(run_size: u32) -> Self {
    Self {
      run_size,
      clear: true,
      ..Default::default()
    }
  }

  pub fn accumulate(mut self) -> Self {
    self.clear = false;
    self
  }

  pub fn no_drain(mut self) -> Self {
    self.no_drain = true;
    self
  }

  pub fn load_weights(mut self) -> Self {
    self.load_weights = true;
    self
  }

  pub fn reset_read_pointers(mut self) -> Self {
    self.reset_weight_read = true;
    self.reset_act_read = true;
    self
  }
}

/// 主机侧命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Start(RunDescriptor),
  /// 不启动运行，只清零所有累加器
  ClearAccumulators,
  /// 复位写指针，立即生效
  ResetWritePointers { weights: bool, activations: bool },
}

/// 阵列规格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayConfig {
  #[serde(default = "default_dim")]
  pub rows: usize,
  #[serde(default = "default_dim")]
  pub cols: usize,
  /// 权重存储深度（行数，每行COLS个权重）
  #[serde(default = "default_store_depth")]
  pub weight_depth: usize,
  /// 激活存储深度（向量数，每个向量ROWS个激活）
  #[serde(default = "default_store_depth")]
  pub act_depth: usize,
  #[serde(default = "default_queue_depth")]
  pub queue_depth: usize,
  /// 装载权重时同时清零act/acc寄存器
  #[serde(default)]
  pub clear_on_load: bool,
}

fn default_dim() -> usize {
  4
}

fn default_store_depth() -> usize {
  256
}

fn default_queue_depth() -> usize {
  4
}

impl Default for ArrayConfig {
  fn default() -> Self {
    Self {
      rows: default_dim(),
      cols: default_dim(),
      weight_depth: default_store_depth(),
      act_depth: default_store_depth(),
      queue_depth: default_queue_depth(),
      clear_on_load: false,
    }
  }
}

impl ArrayConfig {
  pub fn new(rows: usize, cols: usize) -> Self {
    Self {
      rows,
      cols,
      ..Default::default()
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.rows == 0 || self.cols == 0 {
      return Err(Error::invalid_config(format!(
        "array must be at least 1x1, got {}x{}",
        self.rows, self.cols
      )));
    }
    if self.weight_depth < self.rows {
      return Err(Error::invalid_config(format!(
        "weight_depth {} cannot hold one {}-row tile",
        self.weight_depth, self.rows
      )));
    }
    if self.act_depth == 0 {
      return Err(Error::invalid_config("act_depth must be positive"));
    }
    if self.queue_depth == 0 {
      return Err(Error::invalid_config("queue_depth must be positive"));
    }
    Ok(())
  }

  /// 最后一个激活读出后，到它进入右下角单元为止需要等待的周期数
  pub fn pipeline_latency(&self) -> u32 {
    // 存储读1拍 + skew输入级1拍 + 波前穿过阵列
    (1 + 1 + self.rows + self.cols) as u32
  }

  /// 一次排空的节拍数：ROWS行部分和 + 两拍零
  pub fn drain_beats(&self) -> u32 {
    (self.rows + 2) as u32
  }

  /// 最后一个排空节拍发出后，到最右列处理完它为止的周期数
  pub fn drain_tail(&self) -> u32 {
    // 送入阵列1拍 + 横穿 COLS-1 列
    self.cols as u32
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_descriptor_builders() {
    let run = RunDescriptor::new(3).accumulate().no_drain().load_weights();
    assert_eq!(run.run_size, 3);
    assert!(!run.clear);
    assert!(run.no_drain);
    assert!(run.load_weights);
    assert!(!run.reset_act_read);

    let run = RunDescriptor::new(1).reset_read_pointers();
    assert!(run.clear && run.reset_act_read && run.reset_weight_read);
  }

  #[test]
  fn test_array_config_validate() {
    assert!(ArrayConfig::default().validate().is_ok());
    assert!(ArrayConfig::new(0, 4).validate().is_err());

    let mut cfg = ArrayConfig::new(8, 8);
    cfg.weight_depth = 4;
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn test_latency_constants() {
    let cfg = ArrayConfig::new(4, 3);
    assert_eq!(cfg.pipeline_latency(), 9);
    assert_eq!(cfg.drain_beats(), 6);
    assert_eq!(cfg.drain_tail(), 3);
  }
}
