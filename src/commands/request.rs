/// ブリッジへの要求
///
/// 1行1要求の JSON: `{"id": <任意のJSON>, "method": "<コマンド名>", "arguments": {...}}`
use crate::uploader::UploadError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// ブリッジへの要求
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeRequest {
    /// 応答を対応付けるための要求ID（解釈しない）
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl BridgeRequest {
    /// 1行をパースする
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// コマンドの引数
///
/// 型が合わない値や `null` は「指定なし」として扱う。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Option<Map<String, Value>>")]
pub struct Arguments(Map<String, Value>);

impl From<Option<Map<String, Value>>> for Arguments {
    fn from(map: Option<Map<String, Value>>) -> Self {
        Self(map.unwrap_or_default())
    }
}

impl Arguments {
    /// 文字列引数
    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// 整数引数
    pub fn int(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// 必須の文字列引数
    ///
    /// # Errors
    /// 指定がなければ `code` のバリデーションエラー
    pub fn require_string(
        &self,
        key: &str,
        code: &'static str,
        message: &str,
    ) -> Result<&str, UploadError> {
        self.string(key)
            .ok_or_else(|| UploadError::validation(code, message))
    }

    /// 必須の整数引数
    pub fn require_int(&self, key: &str, code: &'static str, message: &str) -> Result<i64, UploadError> {
        self.int(key)
            .ok_or_else(|| UploadError::validation(code, message))
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
