/// Global logging configuration
use env_logger::Env;
use log::LevelFilter;

/// 初始化env_logger，默认级别info，可用 RUST_LOG 覆盖
pub fn init_log() {
  let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
    .format_timestamp(None)
    .format_target(false)
    .try_init();
}

/// 静默模式只保留warn及以上
pub fn set_quiet(quiet: bool) {
  if quiet {
    log::set_max_level(LevelFilter::Warn);
  }
}

/// Check if info-level messages are printed
pub fn is_log_enabled() -> bool {
  log::max_level() >= LevelFilter::Info
}
