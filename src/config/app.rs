/// アプリケーション設定モジュール
///
/// ビルド時に config.toml から読み込まれる静的設定を管理します。
/// これらの設定は実行時には変更できません。
/// 実行時に変更できる値（APIキー、チャンクサイズ等）は `settings` を参照。
use serde::Deserialize;
use std::sync::LazyLock;

/// 1 MiB のバイト数
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// グローバルなアプリケーション設定
///
/// 初回アクセス時に埋め込み済みの config.toml をパースします。
pub static APP_CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::load);

/// アプリケーション全体の設定
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// API関連の設定
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 本番環境のベースURL
    pub production_endpoint: String,

    /// サンドボックス環境のベースURL
    pub sandbox_endpoint: String,

    /// APIリクエストのデフォルトタイムアウト(秒)
    pub timeout_seconds: u64,
}

/// アップロード関連の設定
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// リモートAPIが受け付ける最小チャンクサイズ (バイト)
    pub min_chunk_size: u64,

    /// リモートAPIが受け付ける最大チャンクサイズ (バイト)
    pub max_chunk_size: u64,

    /// デフォルトのチャンクサイズ (バイト)
    pub default_chunk_size: u64,

    /// 送信進捗を報告する粒度 (バイト)
    pub progress_step_bytes: usize,
}

/// ロギング関連の設定
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// RUST_LOG 未設定時のフィルタ (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// ビルド時に埋め込まれたconfig.tomlから設定を読み込む
    ///
    /// # Panics
    /// 設定ファイルのパースに失敗した場合はパニックします。
    /// これはビルド時設定なので、実行時エラーではなくビルド不備として扱います。
    pub fn load() -> Self {
        const CONFIG_STR: &str = include_str!("../../config.toml");
        Self::parse(CONFIG_STR)
            .expect("Failed to parse embedded config.toml. This is a build-time configuration error.")
    }

    /// TOML文字列から設定をパースする
    pub fn parse(content: &str) -> Result<Self, crate::config::error::ConfigError> {
        toml::from_str(content).map_err(|e| {
            crate::config::error::ConfigError::parse_error("Failed to parse application config", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        // ビルド時設定が正しく読み込まれることを確認
        let config = AppConfig::load();
        assert_eq!(config.api.production_endpoint, "https://ws.api.video");
        assert_eq!(config.api.sandbox_endpoint, "https://sandbox.api.video");
        assert!(config.api.timeout_seconds > 0);
    }

    #[test]
    fn test_chunk_bounds_are_consistent() {
        let upload = &APP_CONFIG.upload;
        assert_eq!(upload.min_chunk_size, 5 * BYTES_PER_MB);
        assert_eq!(upload.max_chunk_size, 128 * BYTES_PER_MB);
        assert!(upload.default_chunk_size >= upload.min_chunk_size);
        assert!(upload.default_chunk_size <= upload.max_chunk_size);
        assert!(upload.progress_step_bytes > 0);
    }

    #[test]
    fn test_parse_rejects_incomplete_config() {
        let result = AppConfig::parse("[api]\nproduction_endpoint = \"x\"\n");
        assert!(result.is_err());
    }
}
