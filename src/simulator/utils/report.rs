use super::log::is_log_enabled;
use crate::npu::types::Data;
use crate::simulator::sim::records::NpuRecord;
use serde::Serialize;

/// 一次工作负载运行的汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
  pub workload: String,
  pub outputs: Vec<Vec<Data>>,
  /// 每个输入的预测类别（分数最高的输出）
  pub predictions: Vec<usize>,
  /// 有标签时预测正确的个数
  pub correct: Option<usize>,
  pub cycles: u64,
  pub runs: u64,
  pub records: usize,
}

/// 静默模式下不打印事件记录
pub fn print_simulation_records(records: &[NpuRecord]) {
  if !is_log_enabled() {
    return;
  }
  println!("\n--- Simulation Records ---");
  for record in records {
    println!("  Cycle {:>8}: {:<8} {}", record.cycle, record.action, record.subject);
  }
  println!("--- End Records ---\n");
}

pub fn print_summary(summary: &RunSummary) {
  println!("\n--- Summary: {} ---", summary.workload);
  for (i, out) in summary.outputs.iter().enumerate() {
    match summary.predictions.get(i) {
      Some(class) => println!("  y[{}] = {:?} -> class {}", i, out, class),
      None => println!("  y[{}] = {:?}", i, out),
    }
  }
  if let Some(correct) = summary.correct {
    let total = summary.outputs.len();
    println!(
      "  accuracy: {}/{} ({:.1}%)",
      correct,
      total,
      100.0 * correct as f64 / total.max(1) as f64
    );
  }
  println!("  cycles: {}", summary.cycles);
  println!("  runs:   {}", summary.runs);
  println!("  events: {}", summary.records);
  println!("--- End Summary ---\n");
}
