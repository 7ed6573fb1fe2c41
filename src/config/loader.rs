//! 配置文件读写

use super::{ChatConfig, ConfigError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 默认配置文件路径：`<config_dir>/finchat/config.yaml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("finchat")
        .join("config.yaml")
}

/// 展开路径开头的 `~`
///
/// 只支持 `~` 和 `~/path`，其他形式原样返回。
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let Some(path_str) = path.to_str() else {
        return path.to_path_buf();
    };

    match (path_str, dirs::home_dir()) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        _ => path.to_path_buf(),
    }
}

/// 加载配置
///
/// 文件不存在时返回默认配置。加载后应用环境变量覆盖并校验。
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ChatConfig, ConfigError> {
    let path = expand_tilde(path);

    let mut config = if path.exists() {
        let content = fs::read_to_string(&path)?;
        let config: ChatConfig = serde_yaml::from_str(&content)?;
        info!(path = %path.display(), "已加载配置文件");
        config
    } else {
        debug!(path = %path.display(), "配置文件不存在，使用默认配置");
        ChatConfig::default()
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// 保存配置
pub fn save_config<P: AsRef<Path>>(config: &ChatConfig, path: P) -> Result<(), ConfigError> {
    let path = expand_tilde(path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(config)?;
    fs::write(&path, content)?;
    debug!(path = %path.display(), "配置已保存");
    Ok(())
}
