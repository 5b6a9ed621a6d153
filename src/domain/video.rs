/// リモートAPIが返す動画の記述子
///
/// 中身はAPIの応答JSONそのもので、このクレートは解釈しない。
/// 識別子だけは後続パートの送信に必要なので取り出せるようにしている。
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoDescriptor(Value);

impl VideoDescriptor {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// 動画ID (`videoId` フィールド)
    pub fn video_id(&self) -> Option<&str> {
        self.0.get("videoId").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}
