//! 测试用的脚本化传输

use crate::chat::ChatRequest;
use crate::streaming::error::ChatStreamError;
use crate::streaming::traits::{ByteStream, ChatResponse, ChatTransport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

enum Script {
    /// 固定 chunk 序列
    Chunks {
        status: u16,
        chunks: Vec<Bytes>,
        fail_at_end: bool,
    },
    /// 无响应体
    NoBody { status: u16 },
    /// 按空格切分 prompt 作为 chunk
    Echo,
    /// 发送阶段即失败，没有响应
    Unreachable,
}

/// 按脚本返回响应，并记录请求和读取次数
pub(crate) struct ScriptedTransport {
    script: Script,
    pub sends: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
    pub body_dropped: Arc<AtomicBool>,
    pub last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedTransport {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            sends: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(AtomicUsize::new(0)),
            body_dropped: Arc::new(AtomicBool::new(false)),
            last_request: Mutex::new(None),
        }
    }

    fn chunks(status: u16, chunks: &[&str], fail_at_end: bool) -> Self {
        Self::with_script(Script::Chunks {
            status,
            chunks: chunks
                .iter()
                .map(|c| Bytes::copy_from_slice(c.as_bytes()))
                .collect(),
            fail_at_end,
        })
    }

    pub fn ok(chunks: &[&str]) -> Self {
        Self::chunks(200, chunks, false)
    }

    pub fn ok_owned(chunks: Vec<String>) -> Self {
        Self::with_script(Script::Chunks {
            status: 200,
            chunks: chunks.into_iter().map(Bytes::from).collect(),
            fail_at_end: false,
        })
    }

    pub fn ok_bytes(chunks: Vec<Vec<u8>>) -> Self {
        Self::with_script(Script::Chunks {
            status: 200,
            chunks: chunks.into_iter().map(Bytes::from).collect(),
            fail_at_end: false,
        })
    }

    pub fn status(status: u16, chunks: &[&str]) -> Self {
        Self::chunks(status, chunks, false)
    }

    pub fn no_body(status: u16) -> Self {
        Self::with_script(Script::NoBody { status })
    }

    pub fn failing_after(chunks: &[&str]) -> Self {
        Self::chunks(200, chunks, true)
    }

    pub fn echo() -> Self {
        Self::with_script(Script::Echo)
    }

    pub fn unreachable() -> Self {
        Self::with_script(Script::Unreachable)
    }

    fn body(&self, chunks: Vec<Bytes>, fail_at_end: bool) -> ByteStream {
        let mut items: Vec<Result<Bytes, ChatStreamError>> = chunks.into_iter().map(Ok).collect();
        if fail_at_end {
            items.push(Err(ChatStreamError::transport(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            ))));
        }
        let inner = stream::iter(items)
            .then(|item| async move {
                tokio::task::yield_now().await;
                item
            })
            .boxed();

        Box::pin(CountingBody {
            inner,
            reads: self.reads.clone(),
            dropped: self.body_dropped.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatStreamError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.script {
            Script::Chunks {
                status,
                chunks,
                fail_at_end,
            } => Ok(ChatResponse::new(
                *status,
                self.body(chunks.clone(), *fail_at_end),
            )),
            Script::NoBody { status } => Ok(ChatResponse::without_body(*status)),
            Script::Echo => {
                let chunks = request
                    .prompt
                    .split(' ')
                    .map(|word| Bytes::from(format!("{word} ")))
                    .collect();
                Ok(ChatResponse::new(200, self.body(chunks, false)))
            }
            Script::Unreachable => Err(ChatStreamError::transport(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }

    fn transport_name(&self) -> &'static str {
        "ScriptedTransport"
    }
}

/// 统计读取次数并在释放时打标记的响应体
struct CountingBody {
    inner: ByteStream,
    reads: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

impl Stream for CountingBody {
    type Item = Result<Bytes, ChatStreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = self.inner.as_mut().poll_next(cx);
        if let Poll::Ready(Some(_)) = &poll {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
        poll
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}
