/// 設定管理モジュール
///
/// このモジュールは2層の設定構造を提供します:
/// 1. AppConfig - ビルド時に埋め込まれる静的設定（APP_CONFIG）
/// 2. UploaderSettings - ブリッジから実行時に変更される設定
///
/// # 使用例
///
/// ```rust
/// use vidup::config::{APP_CONFIG, ChunkSize};
///
/// // AppConfig: グローバル定数として直接参照
/// let min = APP_CONFIG.upload.min_chunk_size;
///
/// // 実行時設定: 作成時に自動検証
/// assert!(ChunkSize::new(min).is_ok());
/// assert!(ChunkSize::new(1024).is_err());
/// ```
pub mod app;
pub mod error;
pub mod settings;

pub use app::{APP_CONFIG, BYTES_PER_MB};
pub use error::ConfigError;
pub use settings::{ChunkSize, ClientIdentity, Environment, UploaderSettings};
