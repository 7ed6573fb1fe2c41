//! 惰性消息流
//!
//! [`MessageStream`] 是一个拉取式的 [`Stream`]：构造时不做任何 I/O，
//! 首次 poll 时才发出请求并检查前置条件。每个网络 chunk 产生一条
//! `done: false` 的记录，流结束时再产生一条 `done: true` 的终止记录。

use crate::chat::types::{ChatRequest, GeneratorRecord};
use crate::streaming::error::ChatStreamError;
use crate::streaming::reader::StreamReader;
use crate::streaming::traits::{ChatResponse, ChatTransport};
use futures::future::BoxFuture;
use futures::stream::FusedStream;
use futures::{FutureExt, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// 消息流状态
enum State {
    /// 尚未发出请求
    Idle {
        transport: Arc<dyn ChatTransport>,
        request: ChatRequest,
    },
    /// 等待响应头
    Connecting(BoxFuture<'static, Result<ChatResponse, ChatStreamError>>),
    /// 读取响应体
    Reading(StreamReader),
    /// 已结束（终止记录已交出或出错）
    Done,
}

/// 惰性消息流
///
/// 调用方不拉取时不会读取下一个 chunk。提前丢弃即释放底层响应体。
pub struct MessageStream {
    state: State,
}

impl MessageStream {
    pub(crate) fn new(transport: Arc<dyn ChatTransport>, request: ChatRequest) -> Self {
        Self {
            state: State::Idle { transport, request },
        }
    }

    /// 消费整个流，返回终止记录中的最终文本
    pub async fn collect_final(mut self) -> Result<String, ChatStreamError> {
        let mut last = String::new();
        while let Some(record) = self.next().await {
            let record = record?;
            if record.done {
                return Ok(record.chunk);
            }
            last = record.chunk;
        }
        Ok(last)
    }
}

impl Stream for MessageStream {
    type Item = Result<GeneratorRecord, ChatStreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match std::mem::replace(&mut this.state, State::Done) {
                State::Idle { transport, request } => {
                    tracing::debug!(
                        transport = transport.transport_name(),
                        "[CHAT_STREAM] 消息流首次拉取，发出请求"
                    );
                    let send = async move { transport.send(&request).await };
                    this.state = State::Connecting(send.boxed());
                }
                State::Connecting(mut send) => match send.poll_unpin(cx) {
                    Poll::Pending => {
                        this.state = State::Connecting(send);
                        return Poll::Pending;
                    }
                    Poll::Ready(Err(error)) => return Poll::Ready(Some(Err(error))),
                    Poll::Ready(Ok(response)) => match response.into_body() {
                        Ok(body) => this.state = State::Reading(StreamReader::new(body)),
                        Err(error) => {
                            tracing::error!("[CHAT_STREAM] 前置条件检查失败: {}", error);
                            return Poll::Ready(Some(Err(error)));
                        }
                    },
                },
                State::Reading(mut reader) => match reader.poll_next_unpin(cx) {
                    Poll::Pending => {
                        this.state = State::Reading(reader);
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(Ok(snapshot))) => {
                        this.state = State::Reading(reader);
                        return Poll::Ready(Some(Ok(GeneratorRecord::partial(snapshot))));
                    }
                    Poll::Ready(Some(Err(error))) => return Poll::Ready(Some(Err(error))),
                    Poll::Ready(None) => {
                        reader.metrics().log_metrics("stream_message");
                        return Poll::Ready(Some(Ok(GeneratorRecord::terminal(
                            reader.into_text(),
                        ))));
                    }
                },
                State::Done => return Poll::Ready(None),
            }
        }
    }
}

impl FusedStream for MessageStream {
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Done)
    }
}
