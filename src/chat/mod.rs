//! 对话模块
//!
//! 请求/结果数据模型、HTTP 传输，以及基于流式读取器的三种消费方式。

pub mod client;
pub mod message_stream;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::ChatClient;
pub use message_stream::MessageStream;
pub use transport::HttpTransport;
pub use types::{ChatRequest, GeneratorRecord, RecipeResult};
