//! finchat
//!
//! 财务助手的流式对话响应消费库。把分块到达的 HTTP 响应体转换为：
//! 宽松解析后的结构化结果、逐 chunk 回调的累积文本，或惰性的记录流。

pub mod chat;
pub mod config;
pub mod logging;
pub mod streaming;

pub use chat::{ChatClient, ChatRequest, GeneratorRecord, HttpTransport, MessageStream, RecipeResult};
pub use config::{load_config, ChatConfig, ConfigError, LoggingConfig};
pub use streaming::{ChatResponse, ChatStreamError, ChatTransport, ParseOutcome};
