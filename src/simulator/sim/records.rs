use serde::Serialize;

/// 模型事件记录，用于trace文件和仿真报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpuRecord {
  pub cycle: u64,
  pub action: String,
  pub subject: String,
}

/// Macro to push an NpuRecord with common fields, only while recording is on
///
/// Usage:
/// ```ignore
/// npu_record!(self, "start", "run_size=4");
/// npu_record!(self, "push", format!("{:?}", vector));
/// ```
#[macro_export]
macro_rules! npu_record {
  ($self:expr, $action:expr, $subject:expr) => {
    if $self.recording {
      $self.records.push($crate::simulator::sim::records::NpuRecord {
        cycle: $self.cycle,
        action: $action.to_string(),
        subject: $subject.to_string(),
      });
    }
  };
}
