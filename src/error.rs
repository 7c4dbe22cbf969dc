/// Error types for the NPU model and its simulator front-end
use thiserror::Error;

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  /// 向量宽度与阵列不匹配
  #[error("{what} vector has {got} lanes, expected {expected}")]
  LaneMismatch { what: &'static str, expected: usize, got: usize },

  /// 片上存储已写满
  #[error("{store} store is full ({depth} entries)")]
  StoreFull { store: &'static str, depth: usize },

  /// 输出队列满时仍有向量写入（不变量被破坏）
  #[error("output queue overflow (depth {depth})")]
  QueueOverflow { depth: usize },

  /// 只允许在空闲时修改的配置
  #[error("NPU is busy: {what}")]
  Busy { what: &'static str },

  #[error("invalid configuration: {reason}")]
  InvalidConfig { reason: String },

  #[error("invalid workload: {reason}")]
  InvalidWorkload { reason: String },

  /// 驱动侧的仿真周期预算耗尽
  #[error("simulation stalled: {what} not reached within {cycles} cycles")]
  Stalled { what: &'static str, cycles: u64 },

  /// NPU输出与参考模型不一致
  #[error("output mismatch at vector {index}: got {got:?}, expected {expected:?}")]
  Mismatch { index: usize, got: Vec<i8>, expected: Vec<i8> },

  #[error("simulation aborted by user")]
  Aborted,

  #[error("I/O error: {source}")]
  Io {
    #[from]
    source: std::io::Error,
  },

  #[error("config error: {source}")]
  Config {
    #[from]
    source: config::ConfigError,
  },

  #[error("TOML parse error: {source}")]
  Toml {
    #[from]
    source: toml::de::Error,
  },

  #[error("JSON error: {source}")]
  Json {
    #[from]
    source: serde_json::Error,
  },

  #[error("shell error: {source}")]
  Shell {
    #[from]
    source: rustyline::error::ReadlineError,
  },
}

impl Error {
  pub fn invalid_config(reason: impl Into<String>) -> Self {
    Error::InvalidConfig { reason: reason.into() }
  }

  pub fn invalid_workload(reason: impl Into<String>) -> Self {
    Error::InvalidWorkload { reason: reason.into() }
  }
}
