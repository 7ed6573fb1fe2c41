//! 配置类型定义

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;

/// 对话客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// 对话后端地址
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 对话接口路径
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// 默认语言
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// TCP 连接超时（毫秒）
    ///
    /// 只约束建立连接阶段，读取响应体不设超时。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,

    /// User-Agent 请求头
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_endpoint_path() -> String {
    "/api/chat".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_user_agent() -> String {
    format!("finchat/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint_path: default_endpoint_path(),
            default_locale: default_locale(),
            connect_timeout_ms: None,
            user_agent: default_user_agent(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ChatConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置后端地址
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 设置接口路径
    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    /// 设置默认语言
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// 设置连接超时
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(timeout_ms);
        self
    }

    /// 应用环境变量覆盖
    ///
    /// 支持 `FINCHAT_BASE_URL` 和 `FINCHAT_LOCALE`。
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("FINCHAT_BASE_URL").filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%base_url, "使用环境变量覆盖 base_url");
            self.base_url = base_url;
        }
        if let Some(locale) = lookup("FINCHAT_LOCALE").filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%locale, "使用环境变量覆盖 default_locale");
            self.default_locale = locale;
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: 不支持的协议 {}",
                self.base_url,
                url.scheme()
            )));
        }
        if !self.endpoint_path.starts_with('/') {
            return Err(ConfigError::InvalidEndpoint(self.endpoint_path.clone()));
        }
        Ok(())
    }

    /// 完整的接口 URL
    pub fn endpoint_url(&self) -> Result<String, ConfigError> {
        self.validate()?;
        let base = self.base_url.trim_end_matches('/');
        Ok(format!("{}{}", base, self.endpoint_path))
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出 ANSI 颜色
    #[serde(default = "default_true")]
    pub ansi: bool,

    /// 是否显示 target
    #[serde(default)]
    pub show_target: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: true,
            show_target: false,
        }
    }
}
