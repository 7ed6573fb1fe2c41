//! 部分 JSON 恢复
//!
//! 对可能不完整的 JSON 文本做尽力解析：先尝试严格解析，失败后使用宽松解析器
//! 重建能确定的最深层结构。未闭合的字符串、对象和数组视为在文本末尾闭合，
//! 尚无值的键被省略。
//!
//! 两级解析的结果以 [`ParseOutcome`] 区分，不依赖错误驱动的控制流。

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// 最大嵌套层级，与 serde_json 的递归限制一致
pub const MAX_DEPTH: usize = 128;

/// 宽松解析错误
///
/// 只有文本根本不像 JSON 时才会出现。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartialJsonError {
    /// 文本为空或只有空白
    #[error("文本为空")]
    Empty,

    /// 遇到无法解释的字符
    #[error("无法解析的字符 '{found}'，位置 {position}")]
    Unexpected {
        /// 遇到的字符
        found: char,
        /// 字节偏移
        position: usize,
    },

    /// 嵌套层级过深
    #[error("嵌套层级超过 {limit}")]
    TooDeep {
        /// 层级上限
        limit: usize,
    },
}

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// 严格解析成功，文本是完整的 JSON
    FullyParsed(Value),
    /// 宽松解析得到的尽力结果
    PartiallyParsed(Value),
}

impl ParseOutcome {
    /// 是否为严格解析结果
    pub fn is_complete(&self) -> bool {
        matches!(self, ParseOutcome::FullyParsed(_))
    }

    /// 获取解析出的值
    pub fn value(&self) -> &Value {
        match self {
            ParseOutcome::FullyParsed(v) | ParseOutcome::PartiallyParsed(v) => v,
        }
    }

    /// 取出解析出的值
    pub fn into_value(self) -> Value {
        match self {
            ParseOutcome::FullyParsed(v) | ParseOutcome::PartiallyParsed(v) => v,
        }
    }
}

/// 对文本做两级解析
///
/// # Examples
///
/// ```
/// use finchat::streaming::partial_json::{recover, ParseOutcome};
/// use serde_json::json;
///
/// let outcome = recover(r#"{"title": "Test", "incomplete":"#).unwrap();
/// assert_eq!(outcome, ParseOutcome::PartiallyParsed(json!({"title": "Test"})));
/// ```
pub fn recover(text: &str) -> Result<ParseOutcome, PartialJsonError> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok(ParseOutcome::FullyParsed(value)),
        Err(e) => debug!(error = %e, len = text.len(), "严格解析失败，使用宽松解析"),
    }

    LenientParser::new(text)
        .parse()
        .map(ParseOutcome::PartiallyParsed)
}

/// 对文本做两级解析，无法解释时回退为空对象
///
/// 回退结果标记为 [`ParseOutcome::PartiallyParsed`]。这是批量消费路径使用的入口：
/// 内容格式问题不会作为错误抛出。
pub fn recover_or_empty(text: &str) -> ParseOutcome {
    match recover(text) {
        Ok(outcome) => {
            if !outcome.is_complete() {
                debug!(len = text.len(), "JSON 不完整，已宽松恢复");
            }
            outcome
        }
        Err(e) => {
            warn!(error = %e, len = text.len(), "无法从文本恢复 JSON，返回空对象");
            ParseOutcome::PartiallyParsed(Value::Object(Map::new()))
        }
    }
}

/// 解析文本，无法解释时返回空对象
pub fn parse_partial_json(text: &str) -> Value {
    recover_or_empty(text).into_value()
}

// ============================================================================
// 宽松解析器
// ============================================================================

/// 单个值的解析结果
enum Fragment {
    /// 值完整结束
    Complete(Value),
    /// 文本在值内部结束；`None` 表示没有可用的部分
    Truncated(Option<Value>),
}

struct LenientParser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> LenientParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Value, PartialJsonError> {
        self.skip_whitespace();
        if self.at_end() {
            return Err(PartialJsonError::Empty);
        }

        match self.parse_value(0)? {
            Fragment::Complete(value) => {
                self.skip_whitespace();
                if !self.at_end() {
                    debug!(position = self.pos, "忽略 JSON 值之后的尾随内容");
                }
                Ok(value)
            }
            Fragment::Truncated(value) => Ok(value.unwrap_or(Value::Null)),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn unexpected(&self, position: usize) -> PartialJsonError {
        let found = self.text[position..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        PartialJsonError::Unexpected { found, position }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Fragment, PartialJsonError> {
        self.skip_whitespace();
        let Some(byte) = self.peek() else {
            return Ok(Fragment::Truncated(None));
        };

        match byte {
            b'{' => self.parse_object(depth + 1),
            b'[' => self.parse_array(depth + 1),
            b'"' => Ok(match self.parse_string()? {
                (s, true) => Fragment::Complete(Value::String(s)),
                (s, false) => Fragment::Truncated(Some(Value::String(s))),
            }),
            b'-' | b'0'..=b'9' => self.parse_number(),
            b't' => self.parse_literal("true", Value::Bool(true)),
            b'f' => self.parse_literal("false", Value::Bool(false)),
            b'n' => self.parse_literal("null", Value::Null),
            _ => Err(self.unexpected(self.pos)),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Fragment, PartialJsonError> {
        if depth > MAX_DEPTH {
            return Err(PartialJsonError::TooDeep { limit: MAX_DEPTH });
        }
        self.pos += 1;
        let mut map = Map::new();

        loop {
            self.skip_whitespace();
            let Some(byte) = self.peek() else {
                return Ok(Fragment::Truncated(Some(Value::Object(map))));
            };

            match byte {
                b'}' => {
                    self.pos += 1;
                    return Ok(Fragment::Complete(Value::Object(map)));
                }
                b',' => {
                    self.pos += 1;
                    continue;
                }
                b'"' => {}
                _ => return Err(self.unexpected(self.pos)),
            }

            let (key, closed) = self.parse_string()?;
            if !closed {
                // 键未闭合，省略
                return Ok(Fragment::Truncated(Some(Value::Object(map))));
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Fragment::Truncated(Some(Value::Object(map)))),
                Some(b':') => self.pos += 1,
                Some(_) => return Err(self.unexpected(self.pos)),
            }

            match self.parse_value(depth)? {
                Fragment::Complete(value) => {
                    map.insert(key, value);
                }
                Fragment::Truncated(value) => {
                    if let Some(value) = value {
                        map.insert(key, value);
                    }
                    return Ok(Fragment::Truncated(Some(Value::Object(map))));
                }
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Fragment, PartialJsonError> {
        if depth > MAX_DEPTH {
            return Err(PartialJsonError::TooDeep { limit: MAX_DEPTH });
        }
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(byte) = self.peek() else {
                return Ok(Fragment::Truncated(Some(Value::Array(items))));
            };

            match byte {
                b']' => {
                    self.pos += 1;
                    return Ok(Fragment::Complete(Value::Array(items)));
                }
                b',' => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            match self.parse_value(depth)? {
                Fragment::Complete(value) => items.push(value),
                Fragment::Truncated(value) => {
                    items.extend(value);
                    return Ok(Fragment::Truncated(Some(Value::Array(items))));
                }
            }
        }
    }

    /// 解析字符串，返回内容和是否已闭合
    ///
    /// 未闭合时返回已读到的内容，末尾不完整的转义序列被丢弃。
    fn parse_string(&mut self) -> Result<(String, bool), PartialJsonError> {
        self.pos += 1;
        let mut out = String::new();

        loop {
            let run_start = self.pos;
            while let Some(byte) = self.peek() {
                if byte == b'"' || byte == b'\\' {
                    break;
                }
                self.pos += 1;
            }
            out.push_str(&self.text[run_start..self.pos]);

            match self.peek() {
                None => return Ok((out, false)),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok((out, true));
                }
                Some(_) => {
                    if !self.parse_escape(&mut out)? {
                        return Ok((out, false));
                    }
                }
            }
        }
    }

    /// 解析一个转义序列，文本在序列内部结束时返回 `false`
    fn parse_escape(&mut self, out: &mut String) -> Result<bool, PartialJsonError> {
        let escape_start = self.pos;
        self.pos += 1;
        let Some(byte) = self.peek() else {
            return Ok(false);
        };

        let ch = match byte {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                self.pos += 1;
                return self.parse_unicode_escape(out, escape_start);
            }
            _ => {
                // 非法转义按字面保留
                let Some(ch) = self.text[self.pos..].chars().next() else {
                    return Ok(false);
                };
                self.pos += ch.len_utf8();
                out.push(ch);
                return Ok(true);
            }
        };

        self.pos += 1;
        out.push(ch);
        Ok(true)
    }

    fn parse_unicode_escape(
        &mut self,
        out: &mut String,
        escape_start: usize,
    ) -> Result<bool, PartialJsonError> {
        let Some(first) = self.read_hex4(escape_start)? else {
            return Ok(false);
        };

        match first {
            0xD800..=0xDBFF => {
                let rest = &self.bytes[self.pos..];
                if rest.len() < 2 && b"\\u".starts_with(rest) {
                    return Ok(false);
                }
                if !rest.starts_with(b"\\u") {
                    out.push(char::REPLACEMENT_CHARACTER);
                    return Ok(true);
                }

                let low_start = self.pos;
                self.pos += 2;
                let Some(second) = self.read_hex4(low_start)? else {
                    return Ok(false);
                };
                if (0xDC00..=0xDFFF).contains(&second) {
                    let code = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
                    out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                } else {
                    out.push(char::REPLACEMENT_CHARACTER);
                    out.push(char::from_u32(second).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
            }
            _ => out.push(char::from_u32(first).unwrap_or(char::REPLACEMENT_CHARACTER)),
        }

        Ok(true)
    }

    /// 读取 4 位十六进制数，文本不足 4 位时返回 `None`
    fn read_hex4(&mut self, escape_start: usize) -> Result<Option<u32>, PartialJsonError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let Some(byte) = self.peek() else {
                return Ok(None);
            };
            let digit = (byte as char)
                .to_digit(16)
                .ok_or_else(|| self.unexpected(escape_start))?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(Some(code))
    }

    fn parse_number(&mut self) -> Result<Fragment, PartialJsonError> {
        let start = self.pos;
        while let Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') = self.peek() {
            self.pos += 1;
        }
        let token = &self.text[start..self.pos];

        if let Ok(number) = serde_json::from_str::<Number>(token) {
            return Ok(Fragment::Complete(Value::Number(number)));
        }

        if !self.at_end() {
            return Err(self.unexpected(start));
        }

        // 文本在数字内部结束，去掉无法补全的尾部
        let trimmed = token.trim_end_matches(['.', 'e', 'E', '+', '-']);
        match serde_json::from_str::<Number>(trimmed) {
            Ok(number) => Ok(Fragment::Truncated(Some(Value::Number(number)))),
            Err(_) => Ok(Fragment::Truncated(None)),
        }
    }

    fn parse_literal(&mut self, literal: &str, value: Value) -> Result<Fragment, PartialJsonError> {
        let rest = &self.text[self.pos..];
        if rest.starts_with(literal) {
            self.pos += literal.len();
            return Ok(Fragment::Complete(value));
        }
        if literal.starts_with(rest) {
            // 文本在字面量内部结束
            self.pos = self.bytes.len();
            return Ok(Fragment::Truncated(None));
        }
        Err(self.unexpected(self.pos))
    }
}
