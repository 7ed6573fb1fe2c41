//! 流式读取核心模块
//!
//! 将分块到达的 HTTP 响应体转换为累积文本，并从可能不完整的 JSON 文本中
//! 尽量恢复结构化数据。
//!
//! # 主要组件
//!
//! - `error`: 流式错误类型定义
//! - `decoder`: 跨 chunk 边界的增量 UTF-8 解码器
//! - `reader`: 累积文本快照读取器
//! - `partial_json`: 不完整 JSON 的宽松解析
//! - `metrics`: 流式指标类型定义
//! - `traits`: ChatTransport trait 定义

pub mod decoder;
pub mod error;
pub mod metrics;
pub mod partial_json;
pub mod reader;
pub mod traits;

// 重新导出核心类型
pub use decoder::Utf8StreamDecoder;
pub use error::ChatStreamError;
pub use metrics::StreamMetrics;
pub use partial_json::{
    parse_partial_json, recover, recover_or_empty, ParseOutcome, PartialJsonError,
};
pub use reader::StreamReader;
pub use traits::{reqwest_stream_to_byte_stream, ByteStream, ChatResponse, ChatTransport};
