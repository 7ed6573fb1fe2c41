//! 对话客户端
//!
//! 提供三种消费方式：
//! - [`ChatClient::send_message`]：读完整个响应后宽松解析为结构化结果
//! - [`ChatClient::send_message_stream`]：每个 chunk 回调一次累积文本
//! - [`ChatClient::stream_message`]：惰性的拉取式记录流
//!
//! 每次调用各自发出一个请求、持有独立的解码器和累积文本，
//! 同一客户端上的并发调用互不影响。

use crate::chat::message_stream::MessageStream;
use crate::chat::transport::HttpTransport;
use crate::chat::types::{ChatRequest, RecipeResult};
use crate::config::{ChatConfig, ConfigError};
use crate::streaming::error::ChatStreamError;
use crate::streaming::partial_json;
use crate::streaming::reader::StreamReader;
use crate::streaming::traits::ChatTransport;
use std::sync::Arc;
use tracing::error;

/// 对话客户端
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("transport", &self.transport.transport_name())
            .finish()
    }
}

impl ChatClient {
    /// 使用自定义传输创建客户端
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// 根据配置创建使用 HTTP 传输的客户端
    pub fn from_config(config: &ChatConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// 批量消费：读取完整响应并解析为结构化结果
    ///
    /// 响应文本不是完整 JSON 时返回能恢复出的部分字段；
    /// 完全无法解析时返回空对象。内容问题不会产生错误。
    pub async fn send_message(&self, request: &ChatRequest) -> Result<RecipeResult, ChatStreamError> {
        let reader = self.open(request).await?;
        let (text, metrics) = reader.read_to_end_with_metrics().await?;
        metrics.log_metrics("send_message");

        Ok(RecipeResult::from(partial_json::recover_or_empty(&text)))
    }

    /// 回调消费：每个网络 chunk 调用一次 `on_update`，参数为累积文本
    ///
    /// 返回最终文本。前置条件失败时 `on_update` 不会被调用；
    /// 响应体为空时同样不会被调用，并返回空字符串。
    pub async fn send_message_stream<F>(
        &self,
        request: &ChatRequest,
        mut on_update: F,
    ) -> Result<String, ChatStreamError>
    where
        F: FnMut(&str),
    {
        let mut reader = self.open(request).await?;

        while let Some(snapshot) = reader.next_snapshot().await {
            let snapshot = snapshot?;
            on_update(&snapshot);
        }

        reader.metrics().log_metrics("send_message_stream");
        Ok(reader.into_text())
    }

    /// 惰性消费：返回拉取式记录流
    ///
    /// 构造时不发请求，前置条件错误在第一次拉取时返回。
    pub fn stream_message(&self, request: ChatRequest) -> MessageStream {
        MessageStream::new(self.transport.clone(), request)
    }

    /// 发出请求并检查前置条件
    ///
    /// 状态码和响应体都在读取任何 chunk 之前检查。
    async fn open(&self, request: &ChatRequest) -> Result<StreamReader, ChatStreamError> {
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            error!(
                transport = self.transport.transport_name(),
                "[CHAT_STREAM] 请求失败: status={}", response.status
            );
            return Err(ChatStreamError::RequestFailed {
                status: response.status,
            });
        }
        StreamReader::from_body(response.body).map_err(|e| {
            error!(
                transport = self.transport.transport_name(),
                "[CHAT_STREAM] 响应体不可读"
            );
            e
        })
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::chat::test_support::ScriptedTransport;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// 回调次数等于 chunk 数，累积文本严格增长，最终文本等于最后一次回调
        #[test]
        fn prop_callback_growth(chunks in prop::collection::vec("[ -~]{1,8}", 0..10)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let expected = chunks.concat();
            let transport = Arc::new(ScriptedTransport::ok_owned(chunks.clone()));

            let (final_text, updates) = rt.block_on(async move {
                let mut updates = Vec::new();
                let final_text = ChatClient::new(transport)
                    .send_message_stream(&ChatRequest::new("p", "en"), |t| updates.push(t.to_string()))
                    .await
                    .unwrap();
                (final_text, updates)
            });

            prop_assert_eq!(updates.len(), chunks.len());
            for pair in updates.windows(2) {
                prop_assert!(pair[1].starts_with(&pair[0]));
                prop_assert!(pair[1].len() > pair[0].len());
            }
            prop_assert_eq!(&final_text, &expected);
            if let Some(last) = updates.last() {
                prop_assert_eq!(last, &final_text);
            }
        }
    }
}
