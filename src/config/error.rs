/// Config層のエラー定義
///
/// 埋め込み設定のパースと、実行時に変更される設定値の検証に関するエラー。
/// 外部エラー(toml::de::Error)の発信元を適切に保持する。
use crate::error_severity::ErrorSeverity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// チャンクサイズがリモートAPIの許容範囲外
    #[error("invalid chunk size: {size} bytes (must be between {min} and {max} bytes)")]
    InvalidChunkSize { size: u64, min: u64, max: u64 },

    /// 環境名またはベースURLが不正
    #[error("invalid environment: '{value}' (expected 'production', 'sandbox' or an http(s) URL)")]
    InvalidEnvironment { value: String },

    /// SDK名・アプリケーション名またはそのバージョンが不正
    #[error("invalid {field}: {message}")]
    InvalidClientIdentity { field: String, message: String },

    /// タイムアウト値が不正
    #[error("invalid timeout: {seconds} seconds (must be greater than zero)")]
    InvalidTimeout { seconds: u64 },

    /// 設定ファイルのパースエラー
    #[error("failed to parse config: {context}")]
    ParseError {
        context: String,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// チャンクサイズ範囲外エラーを生成
    pub fn invalid_chunk_size(size: u64, min: u64, max: u64) -> Self {
        Self::InvalidChunkSize { size, min, max }
    }

    /// 不正な環境エラーを生成
    pub fn invalid_environment(value: impl Into<String>) -> Self {
        Self::InvalidEnvironment {
            value: value.into(),
        }
    }

    /// 不正なクライアント識別子エラーを生成
    pub fn invalid_client_identity(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidClientIdentity {
            field: field.into(),
            message: message.into(),
        }
    }

    /// パースエラーを生成
    pub fn parse_error(context: impl Into<String>, source: toml::de::Error) -> Self {
        Self::ParseError {
            context: context.into(),
            source,
        }
    }

    /// エラーの深刻度を返す
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ParseError { .. } => ErrorSeverity::SystemError,
            _ => ErrorSeverity::ConfigError,
        }
    }

    /// ユーザー向けのヒントメッセージを返す
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::InvalidChunkSize { .. } => {
                Some("Chunk size must be between 5 MiB and 128 MiB.")
            }
            Self::InvalidEnvironment { .. } => {
                Some("Use 'production', 'sandbox' or a full base URL such as https://ws.api.video.")
            }
            Self::InvalidClientIdentity { .. } => Some(
                "Names may only contain letters, digits, '-' and '_'; versions look like 1.2.3.",
            ),
            Self::InvalidTimeout { .. } => Some("Timeout is expressed in whole seconds."),
            Self::ParseError { .. } => None,
        }
    }
}
