//! 日志初始化

use crate::config::LoggingConfig;
use tracing::level_filters::LevelFilter;

/// 解析日志级别，无法识别时回退到 `info`
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" | "warning" => LevelFilter::WARN,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

/// 安装全局 fmt subscriber
///
/// 已经安装过 subscriber 时返回 `false`，不视为错误。
pub fn init_logging(config: &LoggingConfig) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_ansi(config.ansi)
        .with_target(config.show_target)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level = %config.level, "日志已初始化");
    }
    installed
}
