//! 流式对话错误类型
//!
//! 定义消费流式对话响应时可能发生的错误。
//!
//! 只有两类前置条件错误由本层产生：上游返回非成功状态码，或响应没有可读的
//! 响应体。网络层错误原样透传，不做包装或重试。内容格式问题不属于错误，
//! 由 [`partial_json`](crate::streaming::partial_json) 吸收。

use std::error::Error as StdError;
use thiserror::Error;

/// 流式对话错误类型
#[derive(Debug, Error)]
pub enum ChatStreamError {
    /// 请求失败
    ///
    /// 上游返回了非 2xx 状态码。在读取任何 chunk 之前抛出，不重试。
    #[error("请求失败: HTTP {status}")]
    RequestFailed {
        /// HTTP 状态码
        status: u16,
    },

    /// 响应体不可读
    ///
    /// 响应不携带可读取的字节流。在读取任何 chunk 之前抛出，不重试。
    #[error("响应体不可读")]
    BodyNotReadable,

    /// 传输层错误
    ///
    /// 连接被拒绝、DNS 解析失败、外部取消等，原样透传底层错误。
    #[error(transparent)]
    Transport(Box<dyn StdError + Send + Sync>),
}

impl ChatStreamError {
    /// 创建传输层错误
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        ChatStreamError::Transport(err.into())
    }

    /// 是否为前置条件错误（流尚未开始消费）
    ///
    /// 调用方可据此区分"从未开始"与"已开始但中途失败"。
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ChatStreamError::RequestFailed { .. } | ChatStreamError::BodyNotReadable
        )
    }

    /// 获取 HTTP 状态码（如果适用）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ChatStreamError::RequestFailed { status } => Some(*status),
            _ => None,
        }
    }

    /// 获取错误类型字符串
    pub fn error_type(&self) -> &'static str {
        match self {
            ChatStreamError::RequestFailed { .. } => "request_failed",
            ChatStreamError::BodyNotReadable => "body_not_readable",
            ChatStreamError::Transport(_) => "transport_error",
        }
    }
}

impl From<reqwest::Error> for ChatStreamError {
    fn from(err: reqwest::Error) -> Self {
        ChatStreamError::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_stream_error_display() {
        let err = ChatStreamError::RequestFailed { status: 502 };
        assert_eq!(err.to_string(), "请求失败: HTTP 502");

        let err = ChatStreamError::BodyNotReadable;
        assert_eq!(err.to_string(), "响应体不可读");
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ChatStreamError::transport(io_err);
        assert_eq!(err.to_string(), "refused");

        match err {
            ChatStreamError::Transport(inner) => {
                let io = inner.downcast_ref::<std::io::Error>().unwrap();
                assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_is_precondition() {
        assert!(ChatStreamError::RequestFailed { status: 500 }.is_precondition());
        assert!(ChatStreamError::BodyNotReadable.is_precondition());
        assert!(!ChatStreamError::transport("reset").is_precondition());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(
            ChatStreamError::RequestFailed { status: 429 }.status_code(),
            Some(429)
        );
        assert_eq!(ChatStreamError::BodyNotReadable.status_code(), None);
    }

    #[test]
    fn test_error_type_string() {
        assert_eq!(
            ChatStreamError::RequestFailed { status: 404 }.error_type(),
            "request_failed"
        );
        assert_eq!(
            ChatStreamError::BodyNotReadable.error_type(),
            "body_not_readable"
        );
        assert_eq!(
            ChatStreamError::transport("boom").error_type(),
            "transport_error"
        );
    }
}
