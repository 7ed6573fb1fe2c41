//! 基于 reqwest 的 HTTP 传输

use crate::chat::ChatRequest;
use crate::config::{ChatConfig, ConfigError};
use crate::streaming::error::ChatStreamError;
use crate::streaming::traits::{reqwest_stream_to_byte_stream, ChatResponse, ChatTransport};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// HTTP 传输
///
/// 向 `<base_url><endpoint_path>` 发送 `POST`，请求体为
/// `{"prompt": ..., "locale": ...}`。不设置读取超时，流的长度由服务端决定。
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// 使用已有的 reqwest 客户端创建传输
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// 根据配置创建传输
    pub fn from_config(config: &ChatConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint_url()?;

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout_ms) = config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder.build()?;

        Ok(Self::new(client, endpoint))
    }

    /// 请求地址
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatStreamError> {
        tracing::info!(
            "[CHAT_STREAM] 发起请求: url={} locale={} prompt_len={}",
            self.endpoint,
            request.locale,
            request.prompt.chars().count()
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("[CHAT_STREAM] 网络错误: {}", e);
                ChatStreamError::from(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            // 错误响应体不读取，丢弃 resp 即释放连接
            tracing::error!("[CHAT_STREAM] 请求失败: status={}", status);
            return Ok(ChatResponse::without_body(status.as_u16()));
        }

        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            tracing::warn!("[CHAT_STREAM] 响应不携带响应体: status={}", status);
            return Ok(ChatResponse::without_body(status.as_u16()));
        }

        tracing::info!("[CHAT_STREAM] 流式响应开始: status={}", status);
        Ok(ChatResponse::new(
            status.as_u16(),
            reqwest_stream_to_byte_stream(resp),
        ))
    }

    fn transport_name(&self) -> &'static str {
        "HttpTransport"
    }
}
