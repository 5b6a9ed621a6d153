/// 実行時設定
///
/// ブリッジ経由で変更される値（SDK名、APIキー、環境、チャンクサイズ、タイムアウト）。
/// アップロード操作は開始時にこの設定のスナップショット（clone）を取り、
/// 実行中の操作が後からの設定変更の影響を受けないようにします。
use crate::config::APP_CONFIG;
use crate::config::error::ConfigError;
use std::fmt;
use std::time::Duration;

/// アップロード先の環境
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Production,
    Sandbox,
    /// 任意のベースURL（テストやプロキシ用）
    Custom(String),
}

impl Environment {
    /// 環境名またはURLを解析する
    ///
    /// # Errors
    /// `production` / `sandbox` / http(s) URL のいずれでもない場合
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "sandbox" => Ok(Self::Sandbox),
            _ if trimmed.starts_with("https://") || trimmed.starts_with("http://") => {
                Ok(Self::Custom(trimmed.trim_end_matches('/').to_string()))
            }
            _ => Err(ConfigError::invalid_environment(value)),
        }
    }

    /// ベースURLを返す
    pub fn base_url(&self) -> &str {
        match self {
            Self::Production => &APP_CONFIG.api.production_endpoint,
            Self::Sandbox => &APP_CONFIG.api.sandbox_endpoint,
            Self::Custom(url) => url,
        }
    }
}

/// SDK名やアプリケーション名とそのバージョン
///
/// リモートAPIへ `name:version` 形式のヘッダーとして送られる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
}

impl ClientIdentity {
    /// 名前とバージョンを検証して作成
    ///
    /// # Arguments
    /// * `field` - エラーメッセージ用のフィールド名（"SDK name" 等）
    pub fn new(field: &str, name: &str, version: &str) -> Result<Self, ConfigError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::invalid_client_identity(
                field,
                format!("'{}' may only contain letters, digits, '-' and '_'", name),
            ));
        }

        if !is_valid_version(version) {
            return Err(ConfigError::invalid_client_identity(
                field,
                format!("version '{}' must look like 1, 1.2 or 1.2.3", version),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// ヘッダー値 (`name:version`)
    pub fn header_value(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

fn is_valid_version(version: &str) -> bool {
    let segments: Vec<&str> = version.split('.').collect();
    (1..=3).contains(&segments.len())
        && segments
            .iter()
            .all(|s| (1..=3).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit()))
}

/// 検証済みのチャンクサイズ
///
/// リモートAPIの許容範囲外の値は作成時点で拒否する（丸めない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSize(u64);

impl ChunkSize {
    /// 範囲を検証して作成
    ///
    /// # Errors
    /// `[min_chunk_size, max_chunk_size]` の範囲外なら `ConfigError::InvalidChunkSize`
    pub fn new(bytes: u64) -> Result<Self, ConfigError> {
        let min = APP_CONFIG.upload.min_chunk_size;
        let max = APP_CONFIG.upload.max_chunk_size;
        if bytes < min || bytes > max {
            return Err(ConfigError::invalid_chunk_size(bytes, min, max));
        }
        Ok(Self(bytes))
    }

    /// バイト数を返す
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(APP_CONFIG.upload.default_chunk_size)
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// アップローダーの実行時設定
#[derive(Clone)]
pub struct UploaderSettings {
    pub sdk: Option<ClientIdentity>,
    pub application: Option<ClientIdentity>,
    pub environment: Environment,
    pub api_key: Option<String>,
    pub chunk_size: ChunkSize,
    pub timeout: Duration,
}

impl Default for UploaderSettings {
    fn default() -> Self {
        Self {
            sdk: None,
            application: None,
            environment: Environment::Production,
            api_key: None,
            chunk_size: ChunkSize::default(),
            timeout: Duration::from_secs(APP_CONFIG.api.timeout_seconds),
        }
    }
}

impl UploaderSettings {
    /// タイムアウトを秒単位で設定
    pub fn set_timeout_seconds(&mut self, seconds: u64) -> Result<(), ConfigError> {
        if seconds == 0 {
            return Err(ConfigError::InvalidTimeout { seconds });
        }
        self.timeout = Duration::from_secs(seconds);
        Ok(())
    }
}

// APIキーをログやパニックメッセージに出さない
impl fmt::Debug for UploaderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploaderSettings")
            .field("sdk", &self.sdk)
            .field("application", &self.application)
            .field("environment", &self.environment)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("chunk_size", &self.chunk_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production").unwrap(), Environment::Production);
        assert_eq!(Environment::parse("Sandbox").unwrap(), Environment::Sandbox);
        assert_eq!(
            Environment::parse("http://localhost:8080/").unwrap(),
            Environment::Custom("http://localhost:8080".to_string())
        );
        assert!(Environment::parse("staging").is_err());
    }

    #[test]
    fn test_environment_base_url() {
        assert_eq!(Environment::Sandbox.base_url(), "https://sandbox.api.video");
        assert_eq!(
            Environment::Custom("http://127.0.0.1:1".to_string()).base_url(),
            "http://127.0.0.1:1"
        );
    }

    #[test]
    fn test_client_identity_validation() {
        let identity = ClientIdentity::new("SDK name", "flutter-uploader", "1.2.0").unwrap();
        assert_eq!(identity.header_value(), "flutter-uploader:1.2.0");

        assert!(ClientIdentity::new("SDK name", "", "1.0").is_err());
        assert!(ClientIdentity::new("SDK name", "has space", "1.0").is_err());
        assert!(ClientIdentity::new("SDK name", "ok", "1.2.3.4").is_err());
        assert!(ClientIdentity::new("SDK name", "ok", "v1").is_err());
        assert!(ClientIdentity::new("SDK name", "ok", "1000").is_err());
    }

    #[test]
    fn test_chunk_size_rejects_out_of_range() {
        // 丸めずにエラーとなることを確認
        let err = ChunkSize::new(1024).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChunkSize { size: 1024, .. }));

        assert!(ChunkSize::new(200 * 1024 * 1024).is_err());
        assert_eq!(ChunkSize::new(5 * 1024 * 1024).unwrap().bytes(), 5 * 1024 * 1024);
    }

    #[test]
    fn test_default_settings() {
        let settings = UploaderSettings::default();
        assert_eq!(settings.environment, Environment::Production);
        assert!(settings.api_key.is_none());
        assert_eq!(settings.chunk_size.bytes(), APP_CONFIG.upload.default_chunk_size);
    }

    #[test]
    fn test_timeout_must_be_positive() {
        let mut settings = UploaderSettings::default();
        assert!(settings.set_timeout_seconds(0).is_err());
        settings.set_timeout_seconds(5).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = UploaderSettings {
            api_key: Some("super-secret".to_string()),
            ..UploaderSettings::default()
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
