use crate::error::{Error, Result};
use crate::npu::{ArrayConfig, QuantParams};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 内置默认配置
const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// 环境变量前缀，例如 SYSNPU__ARRAY__ROWS=8
pub const ENV_PREFIX: &str = "SYSNPU";

/// 模拟配置部分
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSection {
  #[serde(default)]
  pub quiet: bool,
  #[serde(default)]
  pub step_mode: bool,
  #[serde(default)]
  pub trace_file: String,
  #[serde(default)]
  pub workload: String,
  #[serde(default = "default_max_cycles")]
  pub max_cycles: u64,
}

fn default_max_cycles() -> u64 {
  1_000_000
}

impl Default for SimulationSection {
  fn default() -> Self {
    Self {
      quiet: false,
      step_mode: false,
      trace_file: String::new(),
      workload: String::new(),
      max_cycles: default_max_cycles(),
    }
  }
}

/// 统一的应用配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
  #[serde(default)]
  pub array: ArrayConfig,
  /// 全局量化参数（bias由工作负载给出）
  #[serde(default)]
  pub quant: QuantParams,
  #[serde(default)]
  pub simulation: SimulationSection,
}

/// 命令行覆写项
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
  pub quiet: bool,
  pub step: bool,
  pub trace_file: Option<String>,
  pub workload: Option<String>,
  pub rows: Option<usize>,
  pub cols: Option<usize>,
  pub max_cycles: Option<u64>,
}

/// 默认配置 + 可选配置文件 + SYSNPU__* 环境变量
pub fn load_config(custom_config_path: Option<&Path>) -> Result<AppConfig> {
  load_config_with_prefix(custom_config_path, ENV_PREFIX)
}

pub fn load_config_with_prefix(custom_config_path: Option<&Path>, env_prefix: &str) -> Result<AppConfig> {
  let mut builder = Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

  if let Some(path) = custom_config_path {
    builder = builder.add_source(File::from(path.to_path_buf()).format(FileFormat::Toml).required(true));
  }

  let settings = builder
    .add_source(
      Environment::with_prefix(env_prefix)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true),
    )
    .build()?;

  Ok(settings.try_deserialize::<AppConfig>()?)
}

/// 应用CLI参数覆写配置
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &CliOverrides) {
  if cli.quiet {
    config.simulation.quiet = true;
  }
  if cli.step {
    config.simulation.step_mode = true;
  }
  if let Some(file) = &cli.trace_file {
    config.simulation.trace_file = file.clone();
  }
  if let Some(workload) = &cli.workload {
    config.simulation.workload = workload.clone();
  }
  if let Some(rows) = cli.rows {
    config.array.rows = rows;
  }
  if let Some(cols) = cli.cols {
    config.array.cols = cols;
  }
  if let Some(max_cycles) = cli.max_cycles {
    config.simulation.max_cycles = max_cycles;
  }
}

/// 验证配置
pub fn validate_config(config: &AppConfig) -> Result<()> {
  config.array.validate()?;
  config.quant.validate(config.array.cols)?;

  // bias 属于工作负载，不放在全局配置里
  if !config.quant.bias.is_empty() {
    return Err(Error::invalid_config("quant.bias belongs to the workload file"));
  }

  if config.simulation.max_cycles == 0 {
    return Err(Error::invalid_config("max_cycles must be positive"));
  }

  Ok(())
}

/// 配置文件中的相对路径相对于配置文件所在目录
pub fn resolve_paths(config: &mut AppConfig, base: &Path) {
  config.simulation.trace_file = resolve_single_path(&config.simulation.trace_file, base);
  config.simulation.workload = resolve_single_path(&config.simulation.workload, base);
}

/// 补全单个路径
fn resolve_single_path(path_str: &str, base: &Path) -> String {
  if path_str.is_empty() {
    return path_str.to_string();
  }

  let path = Path::new(path_str);

  // 如果已经是绝对路径，直接返回
  if path.is_absolute() {
    return path_str.to_string();
  }

  base.join(path).to_string_lossy().to_string()
}

/// 加载并合并配置
///
/// 流程：
/// 1. 默认配置、自定义配置文件、环境变量逐层合并
/// 2. 补全配置文件中的相对路径
/// 3. 应用CLI参数覆写
/// 4. 验证配置
pub fn load_and_merge_configs(custom_config_path: Option<&Path>, cli: &CliOverrides) -> Result<AppConfig> {
  let mut config = load_config(custom_config_path)?;

  if let Some(base) = custom_config_path.and_then(Path::parent) {
    resolve_paths(&mut config, base);
  }

  apply_cli_overrides(&mut config, cli);

  validate_config(&config)?;

  log::debug!("configuration: {:?}", config);
  Ok(config)
}
