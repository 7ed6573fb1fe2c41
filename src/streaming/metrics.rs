//! 流式读取指标
//!
//! 记录单次流式读取过程中的 chunk 数量、字节数、首字节时间和解码统计。
//! 指标只用于观测，不影响任何消费行为。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 流式读取指标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetrics {
    /// 首字节时间（毫秒）
    ///
    /// 从开始读取到收到第一个 chunk 的时间。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttfb_ms: Option<u64>,

    /// 接收到的 chunk 数量
    pub chunk_count: u32,

    /// 接收到的总字节数
    pub total_bytes: usize,

    /// 解码得到的字符数
    pub decoded_chars: usize,

    /// 被替换为 U+FFFD 的非法 UTF-8 序列数量
    pub invalid_sequence_count: usize,

    /// 开始时间
    pub start_time: DateTime<Utc>,

    /// 结束时间（如果已结束）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// 首个 chunk 时间
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_chunk_time: Option<DateTime<Utc>>,

    /// 最后一个 chunk 时间
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_time: Option<DateTime<Utc>>,

    /// 最小 chunk 大小（字节）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_chunk_size: Option<usize>,

    /// 最大 chunk 大小（字节）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chunk_size: Option<usize>,
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self {
            ttfb_ms: None,
            chunk_count: 0,
            total_bytes: 0,
            decoded_chars: 0,
            invalid_sequence_count: 0,
            start_time: Utc::now(),
            end_time: None,
            first_chunk_time: None,
            last_chunk_time: None,
            min_chunk_size: None,
            max_chunk_size: None,
        }
    }
}

impl StreamMetrics {
    /// 创建新的指标实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录收到一个 chunk
    ///
    /// 第一个 chunk 到达时同时计算 TTFB。
    pub fn record_chunk(&mut self, bytes: usize, decoded_chars: usize) {
        let now = Utc::now();
        self.chunk_count += 1;
        self.total_bytes += bytes;
        self.decoded_chars += decoded_chars;
        self.last_chunk_time = Some(now);

        match self.min_chunk_size {
            Some(min) if bytes >= min => {}
            _ => self.min_chunk_size = Some(bytes),
        }
        match self.max_chunk_size {
            Some(max) if bytes <= max => {}
            _ => self.max_chunk_size = Some(bytes),
        }

        if self.first_chunk_time.is_none() {
            self.first_chunk_time = Some(now);
            self.ttfb_ms = Some((now - self.start_time).num_milliseconds().max(0) as u64);
        }
    }

    /// 记录流末尾追加的字符（解码器收尾产生）
    pub fn record_trailing_chars(&mut self, decoded_chars: usize) {
        self.decoded_chars += decoded_chars;
    }

    /// 同步非法序列计数
    pub fn set_invalid_sequences(&mut self, count: usize) {
        self.invalid_sequence_count = count;
    }

    /// 结束读取
    pub fn finish(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Utc::now());
        }
    }

    /// 判断读取是否已结束
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// 总耗时（毫秒）
    ///
    /// 未结束时返回从开始到现在的时间。
    pub fn duration_ms(&self) -> u64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds().max(0) as u64
    }

    /// 平均 chunk 大小（字节）
    pub fn avg_chunk_size(&self) -> Option<f64> {
        if self.chunk_count == 0 {
            return None;
        }
        Some(self.total_bytes as f64 / self.chunk_count as f64)
    }

    /// 吞吐量（字节/秒）
    pub fn throughput_bytes_per_sec(&self) -> Option<f64> {
        let duration_ms = self.duration_ms();
        if duration_ms == 0 {
            return None;
        }
        Some(self.total_bytes as f64 / (duration_ms as f64 / 1000.0))
    }

    /// 转换为摘要字符串
    pub fn summary(&self) -> String {
        let ttfb = self
            .ttfb_ms
            .map(|t| format!("{}ms", t))
            .unwrap_or_else(|| "N/A".to_string());
        let avg_chunk = self
            .avg_chunk_size()
            .map(|s| format!("{:.0}B", s))
            .unwrap_or_else(|| "N/A".to_string());

        format!(
            "chunks: {}, bytes: {}, chars: {}, duration: {}ms, ttfb: {}, avg_chunk: {}, invalid: {}",
            self.chunk_count,
            self.total_bytes,
            self.decoded_chars,
            self.duration_ms(),
            ttfb,
            avg_chunk,
            self.invalid_sequence_count
        )
    }

    /// 记录详细指标到日志
    pub fn log_metrics(&self, operation: &str) {
        let throughput = self.throughput_bytes_per_sec().unwrap_or(0.0);

        info!(
            operation,
            chunk_count = self.chunk_count,
            total_bytes = self.total_bytes,
            decoded_chars = self.decoded_chars,
            duration_ms = self.duration_ms(),
            ttfb_ms = ?self.ttfb_ms,
            throughput_kbps = %format!("{:.2}", throughput / 1024.0),
            min_chunk_size = ?self.min_chunk_size,
            max_chunk_size = ?self.max_chunk_size,
            invalid_sequence_count = self.invalid_sequence_count,
            "流式读取指标"
        );
    }
}
