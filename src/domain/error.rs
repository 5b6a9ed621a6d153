/// ドメイン層のエラー定義
///
/// アップロードセッションの状態機械とチャンク計画に関する制約違反を表現する。
/// 外部クレートのエラーは含まず、純粋にドメインの制約違反のみ。
use crate::error_severity::ErrorSeverity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ファイルが見つからない
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// ディレクトリが指定された（ファイルが期待される場所）
    #[error("'{path}' is a directory, not a file")]
    NotAFile { path: String },

    /// チャンクサイズが0
    #[error("invalid chunk size: {size}")]
    InvalidChunkSize { size: u64 },

    /// 同じIDのアクティブなセッションが既に存在する
    #[error("upload session already exists: {session_id}")]
    DuplicateSession { session_id: String },

    /// セッションが見つからない
    #[error("upload session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// 現在の状態では受け付けられない操作
    #[error("invalid state for session {session_id} ({state}): {message}")]
    InvalidSessionState {
        session_id: String,
        state: String,
        message: String,
    },

    /// 同じパート番号で異なる内容が再送された
    #[error("part {index} of session {session_id} does not match the part already uploaded")]
    PartMismatch { session_id: String, index: usize },

    /// パートがリモートAPIの受け付ける最大サイズを超えている
    #[error("part of {size} bytes exceeds the maximum of {max} bytes")]
    PartTooLarge { size: u64, max: u64 },
}

impl DomainError {
    /// ファイルが見つからないエラーを生成
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// ディレクトリ指定エラーを生成
    pub fn not_a_file(path: impl Into<String>) -> Self {
        Self::NotAFile { path: path.into() }
    }

    /// セッション未検出エラーを生成
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// 状態不正エラーを生成
    pub fn invalid_state(
        session_id: impl Into<String>,
        state: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidSessionState {
            session_id: session_id.into(),
            state: state.to_string(),
            message: message.into(),
        }
    }

    /// エラーの深刻度を返す
    ///
    /// 終了コードの決定に使用できる
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidChunkSize { .. } => ErrorSeverity::ConfigError,
            _ => ErrorSeverity::UserError,
        }
    }

    /// ユーザー向けのヒントメッセージを返す
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::FileNotFound { .. } => {
                Some("Please check the file path and ensure the file exists.")
            }
            Self::NotAFile { .. } => Some("Please specify a file, not a directory."),
            Self::InvalidChunkSize { .. } => Some("Chunk size must be greater than zero."),
            Self::DuplicateSession { .. } => {
                Some("Finish or cancel the existing progressive session before creating a new one.")
            }
            Self::SessionNotFound { .. } => {
                Some("Create a progressive upload session before uploading parts.")
            }
            Self::InvalidSessionState { .. } => None,
            Self::PartTooLarge { .. } => {
                Some("Split the file into smaller parts before uploading.")
            }
            Self::PartMismatch { .. } => {
                Some("A part can only be re-sent with exactly the same content.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = DomainError::invalid_state("s1", "Succeeded", "session already finished");
        assert_eq!(
            err.to_string(),
            "invalid state for session s1 (Succeeded): session already finished"
        );
        assert_eq!(err.severity(), ErrorSeverity::UserError);
    }

    #[test]
    fn test_hints() {
        assert!(DomainError::session_not_found("x").hint().is_some());
        assert!(DomainError::file_not_found("/nope").hint().is_some());
        assert_eq!(
            DomainError::InvalidChunkSize { size: 0 }.severity(),
            ErrorSeverity::ConfigError
        );
    }
}
