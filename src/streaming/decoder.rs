//! 增量 UTF-8 解码器
//!
//! 网络 chunk 的边界没有语义，一个多字节字符可能被拆到两个 chunk 中。
//! 解码器缓存末尾不完整的字节序列，等下一个 chunk 到达后再拼接解码，
//! 因此拆分的字符不会产生替换字符，也不会丢失字节。
//!
//! 真正非法的字节序列按 `String::from_utf8_lossy` 的规则替换为 U+FFFD。

/// UTF-8 编码单个字符的最大字节数
const MAX_SEQUENCE_LEN: usize = 4;

/// 增量 UTF-8 解码器
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// 上一个 chunk 末尾不完整的字节（最多 3 字节）
    pending: Vec<u8>,
    /// 被替换为 U+FFFD 的非法序列数量
    invalid_sequences: usize,
}

impl Utf8StreamDecoder {
    /// 创建新的解码器
    pub fn new() -> Self {
        Self::default()
    }

    /// 解码一个 chunk
    ///
    /// 返回本次可以确定的文本。末尾不完整的字节会被缓存，不出现在返回值中。
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        if self.pending.is_empty() {
            return self.decode_bytes(chunk);
        }

        let mut combined = std::mem::take(&mut self.pending);
        combined.extend_from_slice(chunk);
        self.decode_bytes(&combined)
    }

    /// 结束解码
    ///
    /// 如果流结束时仍有不完整的字节序列，返回一个替换字符；否则返回空字符串。
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }

        self.pending.clear();
        self.invalid_sequences += 1;
        char::REPLACEMENT_CHARACTER.to_string()
    }

    /// 是否有等待后续字节的不完整序列
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 已替换的非法序列数量
    pub fn invalid_sequences(&self) -> usize {
        self.invalid_sequences
    }

    fn decode_bytes(&mut self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));

                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.invalid_sequences += 1;
                            rest = &tail[len..];
                        }
                        None => {
                            // 末尾序列不完整，等待下一个 chunk
                            debug_assert!(tail.len() < MAX_SEQUENCE_LEN);
                            self.pending.extend_from_slice(tail);
                            break;
                        }
                    }
                }
            }
        }

        out
    }
}
