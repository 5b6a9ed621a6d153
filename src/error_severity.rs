//! エラー深刻度
//!
//! 全レイヤー（domain, api, config, uploader）が共有する最も抽象的なエラー分類。
//! ブリッジのバイナリはこの分類から終了コードを決定する。
//!
//! **依存方向の原則:**
//! - 内側層はこのモジュールに依存してOK
//! - このモジュールは他のモジュールに依存しない（独立）

use std::fmt;

/// エラーの深刻度と対応する終了コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// 呼び出し側の入力エラー
    ///
    /// 必須フィールドの欠落、存在しないファイル、未作成のセッション参照など。
    ///
    /// **Exit Code: 1**
    UserError,

    /// 設定エラー
    ///
    /// チャンクサイズが範囲外、環境名が不正など。
    ///
    /// **Exit Code: 2**
    ConfigError,

    /// システムエラー
    ///
    /// ネットワーク障害、I/O 障害など、呼び出し側が直せない外部要因。
    ///
    /// **Exit Code: 3**
    SystemError,

    /// リモートAPIが報告したエラー
    ///
    /// クォータ超過、検証エラーなど。内容はAPIの応答そのまま。
    ///
    /// **Exit Code: 4**
    RemoteError,
}

impl ErrorSeverity {
    /// 対応する Unix 終了コードを返す
    pub fn exit_code(self) -> i32 {
        match self {
            Self::UserError => 1,
            Self::ConfigError => 2,
            Self::SystemError => 3,
            Self::RemoteError => 4,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserError => write!(f, "user error"),
            Self::ConfigError => write!(f, "configuration error"),
            Self::SystemError => write!(f, "system error"),
            Self::RemoteError => write!(f, "remote API error"),
        }
    }
}
