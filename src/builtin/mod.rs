/// Cycle-level building blocks shared by every hardware module
pub mod port;

pub use port::Wire;

/// 所有硬件模块的统一接口
///
/// `run` 只读取本模块已锁存的输入信号，并生成本周期的输出；
/// 顶层在所有模块运行完之后再把输出连到下一周期的输入。
pub trait Module {
  /// 推进一个时钟沿
  fn run(&mut self);

  /// 回到上电状态
  fn reset(&mut self);

  fn name(&self) -> &str;
}
