use std::io;
/// インフラ層のエラー定義
///
/// 外部システム（ファイルシステム、ネットワーク、リモートAPI）との
/// やり取りで発生するエラーを構造化して定義。
/// リモートAPIが返したエラーは解釈せず、ステータス・メッセージ・応答本文をそのまま保持する。
use crate::config::error::ConfigError;
use crate::error_severity::ErrorSeverity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfraError {
    /// ネットワークエラー
    #[error("network error: {message}")]
    Network { message: String },

    /// リモートAPIが返したエラー
    #[error("API error: {endpoint} - {message}")]
    Api {
        endpoint: String,
        message: String,
        status_code: Option<u16>,
        /// 応答本文（そのまま）
        body: Option<String>,
    },

    /// タイムアウトエラー
    #[error("operation timed out: {operation}")]
    Timeout { operation: String },

    /// 応答が想定外の形式
    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// その他のI/Oエラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// リクエストを組み立てられない設定値
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InfraError {
    /// ネットワークエラーを作成
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// タイムアウトエラーを作成
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// APIエラーを作成
    pub fn api(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
        body: Option<String>,
    ) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            message: message.into(),
            status_code,
            body,
        }
    }

    /// 不正な応答エラーを作成
    pub fn invalid_response(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// エラーの深刻度を返す
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Api { .. } => ErrorSeverity::RemoteError,
            Self::Config(e) => e.severity(),
            _ => ErrorSeverity::SystemError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_payload() {
        let err = InfraError::api(
            "/videos/vi1/source",
            "Quota exceeded",
            Some(429),
            Some(r#"{"status":429}"#.to_string()),
        );
        assert_eq!(err.to_string(), "API error: /videos/vi1/source - Quota exceeded");
        assert_eq!(err.severity(), ErrorSeverity::RemoteError);
        if let InfraError::Api {
            status_code, body, ..
        } = err
        {
            assert_eq!(status_code, Some(429));
            assert_eq!(body.as_deref(), Some(r#"{"status":429}"#));
        } else {
            panic!("Expected Api error");
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let err: InfraError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, InfraError::Io(_)));
        assert_eq!(err.severity(), ErrorSeverity::SystemError);
    }

    #[test]
    fn test_config_error_keeps_config_severity() {
        let err: InfraError =
            ConfigError::invalid_client_identity("AV-Origin-Sdk", "invalid header value").into();
        assert!(matches!(err, InfraError::Config(_)));
        assert_eq!(err.severity(), ErrorSeverity::ConfigError);
    }
}
