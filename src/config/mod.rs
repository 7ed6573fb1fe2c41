//! 配置管理模块
//!
//! 提供 YAML 配置文件加载、环境变量覆盖和配置校验

mod loader;
mod types;

pub use loader::{default_config_path, expand_tilde, load_config, save_config};
pub use types::{ChatConfig, LoggingConfig};

use thiserror::Error;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML 解析错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("无效的 base_url: {0}")]
    InvalidUrl(String),

    #[error("无效的接口路径: {0}")]
    InvalidEndpoint(String),

    #[error("无法创建 HTTP 客户端: {0}")]
    HttpClient(#[from] reqwest::Error),
}
