/// API通信用の型定義
///
/// api.videoのエラーレスポンス（problem JSON）をデシリアライズするための構造体を定義します。
/// 成功レスポンスは解釈せず `VideoDescriptor` としてそのまま扱います。
use serde::{Deserialize, Serialize};

/// エラーレスポンス
///
/// 例: `{"type":"...","title":"The request is invalid.","status":400,"detail":"..."}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiProblem {
    /// エラーの概要
    #[serde(default)]
    pub title: Option<String>,

    /// 詳細メッセージ
    #[serde(default)]
    pub detail: Option<String>,

    /// HTTPステータス
    #[serde(default)]
    pub status: Option<u16>,

    /// 問題のあるフィールド名（バリデーションエラー時）
    #[serde(default)]
    pub name: Option<String>,
}

impl ApiProblem {
    /// 応答本文からパースする（problem JSON でなければ None）
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|problem| problem.title.is_some() || problem.detail.is_some())
    }

    /// 人間向けメッセージ
    pub fn message(&self) -> Option<String> {
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) if title != detail => Some(format!("{} {}", title, detail)),
            (Some(title), _) => Some(title.clone()),
            (None, Some(detail)) => Some(detail.clone()),
            (None, None) => None,
        }
    }
}
