//! 流式读取器
//!
//! 将响应体字节流转换为累积文本快照序列：每收到一个网络 chunk，解码后追加到
//! 累积文本，并交出累积文本的新副本。快照只会通过追加增长，流结束后的最终
//! 文本等于整个字节序列的解码结果，与传输层如何切分 chunk 无关。

use crate::streaming::decoder::Utf8StreamDecoder;
use crate::streaming::error::ChatStreamError;
use crate::streaming::metrics::StreamMetrics;
use crate::streaming::traits::ByteStream;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace};

/// 流式读取器
///
/// 同一时刻只有一个对底层流的读取在进行。丢弃读取器即释放底层流，
/// 之后不会再读取任何 chunk。
pub struct StreamReader {
    /// 响应体字节流
    body: ByteStream,
    /// 增量解码器
    decoder: Utf8StreamDecoder,
    /// 累积文本
    text: String,
    /// 读取指标
    metrics: StreamMetrics,
    /// 是否已结束（正常结束或出错）
    finished: bool,
}

impl StreamReader {
    /// 创建新的读取器
    pub fn new(body: ByteStream) -> Self {
        Self {
            body,
            decoder: Utf8StreamDecoder::new(),
            text: String::new(),
            metrics: StreamMetrics::new(),
            finished: false,
        }
    }

    /// 从可能缺失的响应体创建读取器
    ///
    /// 响应体缺失时立即返回 [`ChatStreamError::BodyNotReadable`]，不进行任何读取。
    pub fn from_body(body: Option<ByteStream>) -> Result<Self, ChatStreamError> {
        body.map(Self::new).ok_or(ChatStreamError::BodyNotReadable)
    }

    /// 当前累积文本
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 取出累积文本
    pub fn into_text(self) -> String {
        self.text
    }

    /// 获取指标
    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }

    /// 是否已读到流末尾
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 读取下一个快照
    ///
    /// 流结束时返回 `None`，此时 [`text`](Self::text) 即为最终文本。
    pub async fn next_snapshot(&mut self) -> Option<Result<String, ChatStreamError>> {
        self.next().await
    }

    /// 读取到流末尾，丢弃中间快照，返回最终文本
    pub async fn read_to_end(self) -> Result<String, ChatStreamError> {
        self.read_to_end_with_metrics().await.map(|(text, _)| text)
    }

    /// 读取到流末尾，返回最终文本和本次读取的指标
    pub async fn read_to_end_with_metrics(
        mut self,
    ) -> Result<(String, StreamMetrics), ChatStreamError> {
        while let Some(snapshot) = self.next().await {
            snapshot?;
        }
        Ok((self.text, self.metrics))
    }

    /// 解码一个 chunk 并追加到累积文本
    fn process_chunk(&mut self, bytes: &[u8]) {
        let decoded = self.decoder.decode(bytes);
        let decoded_chars = decoded.chars().count();
        self.text.push_str(&decoded);

        let first_chunk = self.metrics.chunk_count == 0;
        self.metrics.record_chunk(bytes.len(), decoded_chars);
        self.metrics
            .set_invalid_sequences(self.decoder.invalid_sequences());

        if first_chunk {
            debug!(ttfb_ms = ?self.metrics.ttfb_ms, "收到首个 chunk");
        }
        trace!(
            bytes = bytes.len(),
            decoded_chars,
            pending = self.decoder.has_pending(),
            "chunk 已解码"
        );
    }

    /// 结束读取，冲刷解码器中剩余的不完整序列
    fn finish_stream(&mut self) {
        let tail = self.decoder.finish();
        if !tail.is_empty() {
            debug!("流结束时存在不完整的 UTF-8 序列");
            self.metrics.record_trailing_chars(tail.chars().count());
            self.text.push_str(&tail);
        }
        self.metrics
            .set_invalid_sequences(self.decoder.invalid_sequences());
        self.metrics.finish();
        self.finished = true;

        debug!(metrics = %self.metrics.summary(), "流式读取完成");
    }
}

impl Stream for StreamReader {
    type Item = Result<String, ChatStreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            match self.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if bytes.is_empty() {
                        // 空 chunk 不携带数据，不产生快照
                        continue;
                    }
                    self.process_chunk(&bytes);
                    return Poll::Ready(Some(Ok(self.text.clone())));
                }
                Poll::Ready(Some(Err(error))) => {
                    self.finished = true;
                    self.metrics.finish();
                    debug!(error = %error, "流式读取中断");
                    return Poll::Ready(Some(Err(error)));
                }
                Poll::Ready(None) => {
                    self.finish_stream();
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use proptest::prelude::*;

    /// 生成包含多字节字符的文本
    fn arb_text() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                Just("a"),
                Just(" "),
                Just("é"),
                Just("预算"),
                Just("💰"),
                Just("\"title\":"),
                Just("{"),
                Just("}"),
            ],
            0..30,
        )
        .prop_map(|parts| parts.concat())
    }

    /// 将字节序列按随机切点拆成 chunk
    fn split_at_points(bytes: &[u8], mut points: Vec<usize>) -> Vec<Vec<u8>> {
        points.retain(|p| *p > 0 && *p < bytes.len());
        points.sort_unstable();
        points.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for p in points {
            chunks.push(bytes[start..p].to_vec());
            start = p;
        }
        if start < bytes.len() {
            chunks.push(bytes[start..].to_vec());
        }
        chunks
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// 任意切分方式下，快照按追加增长，最终文本等于整体解码结果
        #[test]
        fn prop_cumulative_growth_independent_of_chunking(
            text in arb_text(),
            points in prop::collection::vec(0usize..200, 0..12),
        ) {
            let chunks = split_at_points(text.as_bytes(), points);
            let chunk_count = chunks.len();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let (snapshots, final_text) = rt.block_on(async move {
                let items: Vec<Result<Bytes, ChatStreamError>> =
                    chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
                let mut reader = StreamReader::new(Box::pin(stream::iter(items)));
                let mut snapshots = Vec::new();
                while let Some(snapshot) = reader.next_snapshot().await {
                    snapshots.push(snapshot.unwrap());
                }
                (snapshots, reader.into_text())
            });

            prop_assert_eq!(snapshots.len(), chunk_count);
            let mut previous = String::new();
            for snapshot in &snapshots {
                prop_assert!(snapshot.starts_with(&previous));
                prop_assert!(!snapshot.contains(char::REPLACEMENT_CHARACTER));
                previous = snapshot.clone();
            }
            prop_assert_eq!(&final_text, &text);
            if let Some(last) = snapshots.last() {
                prop_assert_eq!(last, &text);
            }
        }
    }
}
