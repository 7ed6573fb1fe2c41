//! 对话数据模型

use crate::streaming::partial_json::ParseOutcome;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 对话请求
///
/// 由调用方构造，核心不做修改。序列化为 `{"prompt": ..., "locale": ...}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub locale: String,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            locale: locale.into(),
        }
    }

    /// 使用配置中的默认语言创建请求
    pub fn with_default_locale(prompt: impl Into<String>, config: &crate::config::ChatConfig) -> Self {
        Self::new(prompt, config.default_locale.clone())
    }
}

/// 流式记录
///
/// 惰性序列中的一个元素：`chunk` 是到目前为止的累积文本，
/// `done` 只在最后一条记录上为 `true`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorRecord {
    pub chunk: String,
    pub done: bool,
}

impl GeneratorRecord {
    /// 中间记录
    pub fn partial(chunk: String) -> Self {
        Self { chunk, done: false }
    }

    /// 终止记录
    pub fn terminal(chunk: String) -> Self {
        Self { chunk, done: true }
    }
}

/// 批量消费的结构化结果
///
/// 字段由上游 JSON 决定；JSON 不完整时只包含能从部分文本中确定的字段。
/// 部分结果同样是有效、可展示的数据。
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeResult {
    value: Value,
    complete: bool,
}

impl RecipeResult {
    pub fn new(value: Value, complete: bool) -> Self {
        Self { value, complete }
    }

    /// 标题字段
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }

    /// 正文字段
    pub fn content(&self) -> Option<&str> {
        self.get("content").and_then(Value::as_str)
    }

    /// 读取任意字段，顶层不是对象时返回 `None`
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.as_object().and_then(|map| map.get(field))
    }

    /// 结果是否来自完整 JSON 的严格解析
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// 反序列化为调用方的具体类型
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.value)
    }
}

impl From<ParseOutcome> for RecipeResult {
    fn from(outcome: ParseOutcome) -> Self {
        let complete = outcome.is_complete();
        Self::new(outcome.into_value(), complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest::new("How do I budget?", "en-US");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, json!({"prompt": "How do I budget?", "locale": "en-US"}));
    }

    #[test]
    fn test_recipe_result_accessors() {
        let result = RecipeResult::new(
            json!({"title": "Financial Advice", "content": "Save money by...", "tips": 3}),
            true,
        );
        assert_eq!(result.title(), Some("Financial Advice"));
        assert_eq!(result.content(), Some("Save money by..."));
        assert_eq!(result.get("tips"), Some(&json!(3)));
        assert!(result.is_complete());
    }

    #[test]
    fn test_recipe_result_partial_fields() {
        let result = RecipeResult::from(ParseOutcome::PartiallyParsed(json!({"title": "Test"})));
        assert_eq!(result.title(), Some("Test"));
        assert_eq!(result.content(), None);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_recipe_result_non_object() {
        let result = RecipeResult::new(json!(["a"]), true);
        assert_eq!(result.title(), None);
        assert_eq!(result.get("title"), None);
    }

    #[test]
    fn test_recipe_result_deserialize() {
        #[derive(Deserialize)]
        struct Advice {
            title: String,
            #[serde(default)]
            content: Option<String>,
        }

        let result = RecipeResult::new(json!({"title": "Test"}), false);
        let advice: Advice = result.deserialize().unwrap();
        assert_eq!(advice.title, "Test");
        assert!(advice.content.is_none());
    }

    #[test]
    fn test_generator_record_constructors() {
        assert!(!GeneratorRecord::partial("a".into()).done);
        assert!(GeneratorRecord::terminal("a".into()).done);
    }
}
