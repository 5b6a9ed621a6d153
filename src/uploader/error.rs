/// アップロード操作のエラー定義
///
/// 各レイヤーのエラーを包まずにそのまま保持する。
/// 呼び出し側は、リモートAPIが報告したエラー（クォータ、検証など）と
/// ローカルのエラー（ファイルなし、チャンクサイズ不正など）を区別できる。
use crate::api::error::InfraError;
use crate::config::error::ConfigError;
use crate::domain::error::DomainError;
use crate::error_severity::ErrorSeverity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    /// 必須フィールドの欠落・矛盾（セッションの作業が始まる前に検出）
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    /// 設定エラー
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// ドメインの制約違反
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// リモートAPI・ネットワーク・I/Oのエラー
    #[error(transparent)]
    Remote(#[from] InfraError),

    /// 同じ操作IDの操作が実行中
    #[error("operation already in progress: {operation_id}")]
    OperationInProgress { operation_id: String },
}

impl UploadError {
    /// バリデーションエラーを生成
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    /// エラーの深刻度を返す
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation { .. } | Self::OperationInProgress { .. } => ErrorSeverity::UserError,
            Self::Config(e) => e.severity(),
            Self::Domain(e) => e.severity(),
            Self::Remote(e) => e.severity(),
        }
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        Self::Remote(InfraError::Io(e))
    }
}
