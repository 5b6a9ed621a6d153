/// ブリッジの出力メッセージ
///
/// 各コマンドの結果とイベントはこの型で表し、プレゼンテーション層（output.rs）が
/// 1行1メッセージの JSON として書き出す。
use crate::api::error::InfraError;
use crate::domain::error::DomainError;
use crate::uploader::UploadError;
use serde::Serialize;
use serde_json::Value;

/// キャンセル時のエラーコード
pub const CANCELLED_CODE: &str = "upload_cancelled";
/// キャンセル時のメッセージ
pub const CANCELLED_MESSAGE: &str = "Upload was cancelled";

/// 出力メッセージの統一型
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// 要求の成功結果
    Result { id: Value, value: Value },
    /// 要求のエラー
    Error {
        id: Value,
        #[serde(flatten)]
        error: BridgeError,
    },
    /// アップロードの進捗
    ProgressChanged {
        #[serde(rename = "uploadId")]
        upload_id: String,
        progress: u8,
    },
}

impl OutboundMessage {
    /// 要求への応答を作成
    pub fn reply(id: Value, result: Result<Value, BridgeError>) -> Self {
        match result {
            Ok(value) => Self::Result { id, value },
            Err(error) => Self::Error { id, error },
        }
    }
}

/// 呼び出し側へ返すエラー
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeError {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl BridgeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }

    /// キャンセル（エラーではないが同じ経路で届ける）
    pub fn cancelled() -> Self {
        Self::new(CANCELLED_CODE, CANCELLED_MESSAGE, None)
    }

    /// 未知のコマンド
    pub fn not_implemented(method: &str) -> Self {
        Self::new(
            "not_implemented",
            format!("Method '{}' is not implemented", method),
            None,
        )
    }

    /// パースできない要求
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request", message, None)
    }
}

/// 操作のエラーをコードに対応付ける
///
/// リモートAPIのエラーはステータスコード・メッセージ・応答本文をそのまま渡す。
/// ローカルのエラーは固定の識別子とメッセージで渡す。
impl From<&UploadError> for BridgeError {
    fn from(err: &UploadError) -> Self {
        let message = err.to_string();
        match err {
            UploadError::Validation { code, message } => Self::new(*code, message.clone(), None),
            UploadError::Config(_) => Self::new("invalid_configuration", message, None),
            UploadError::Domain(e) => Self::new(domain_code(e), message, None),
            UploadError::Remote(InfraError::Api {
                status_code,
                message,
                body,
                ..
            }) => Self::new(
                status_code
                    .map(|status| status.to_string())
                    .unwrap_or_else(|| "api_error".to_string()),
                message.clone(),
                body.clone().map(Value::String),
            ),
            UploadError::Remote(e) => Self::new(infra_code(e), message, None),
            UploadError::OperationInProgress { .. } => {
                Self::new("operation_in_progress", message, None)
            }
        }
    }
}

impl From<UploadError> for BridgeError {
    fn from(err: UploadError) -> Self {
        Self::from(&err)
    }
}

fn domain_code(err: &DomainError) -> &'static str {
    match err {
        DomainError::FileNotFound { .. } => "file_not_found",
        DomainError::NotAFile { .. } => "not_a_file",
        DomainError::InvalidChunkSize { .. } => "invalid_chunk_size",
        DomainError::DuplicateSession { .. } => "duplicate_session",
        DomainError::SessionNotFound { .. } => "session_not_found",
        DomainError::InvalidSessionState { .. } => "invalid_session_state",
        DomainError::PartMismatch { .. } => "part_mismatch",
        DomainError::PartTooLarge { .. } => "part_too_large",
    }
}

fn infra_code(err: &InfraError) -> &'static str {
    match err {
        InfraError::Network { .. } => "network_error",
        InfraError::Api { .. } => "api_error",
        InfraError::Timeout { .. } => "timeout",
        InfraError::InvalidResponse { .. } => "invalid_response",
        InfraError::Io(_) => "io_error",
        InfraError::Config(_) => "invalid_configuration",
    }
}
