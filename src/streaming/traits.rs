//! ChatTransport Trait 定义
//!
//! 对话后端的传输接口。核心只依赖"状态码 + 可顺序读取的字节流"，
//! 具体的 HTTP 实现见 [`HttpTransport`](crate::chat::HttpTransport)。

use crate::chat::ChatRequest;
use crate::streaming::error::ChatStreamError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::fmt;
use std::pin::Pin;

/// 响应字节流类型别名
///
/// 每个 Item 是传输层交付的一个 chunk 或传输错误。chunk 按传输层顺序到达，
/// 大小没有协议含义。
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatStreamError>> + Send>>;

/// 传输层响应
///
/// 发出请求后得到的状态码和（可能缺失的）响应体。
pub struct ChatResponse {
    /// HTTP 状态码
    pub status: u16,
    /// 响应体字节流；`None` 表示响应不携带可读的响应体
    pub body: Option<ByteStream>,
}

impl ChatResponse {
    /// 创建带响应体的响应
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    /// 创建不带响应体的响应
    pub fn without_body(status: u16) -> Self {
        Self { status, body: None }
    }

    /// 状态码是否为 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 校验前置条件并取出响应体
    ///
    /// 先检查状态码，再检查响应体，两项检查都不读取任何 chunk。
    pub fn into_body(self) -> Result<ByteStream, ChatStreamError> {
        if !self.is_success() {
            return Err(ChatStreamError::RequestFailed {
                status: self.status,
            });
        }
        self.body.ok_or(ChatStreamError::BodyNotReadable)
    }
}

impl fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatResponse")
            .field("status", &self.status)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// 对话传输 Trait
///
/// 每次调用发出一次请求，不做重试。网络层错误以
/// [`ChatStreamError::Transport`] 原样返回。
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// 发送对话请求，返回状态码和响应体
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatStreamError>;

    /// 传输名称，用于日志
    fn transport_name(&self) -> &'static str;
}

// ============================================================================
// 辅助函数
// ============================================================================

/// 将 reqwest 的 bytes_stream 转换为 ByteStream
pub fn reqwest_stream_to_byte_stream(response: reqwest::Response) -> ByteStream {
    use futures::StreamExt;

    let stream = response.bytes_stream().map(|result| result.map_err(ChatStreamError::from));

    Box::pin(stream)
}
