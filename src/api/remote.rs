//! リモートアップロードAPIの抽象
//!
//! アップロードセッションはこのトレイト越しにパートを送る。
//! HTTP 実装は [`ApiClient`](crate::api::client::ApiClient)、テストではモックに差し替える。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::api::error::InfraError;
use crate::config::UploaderSettings;
use crate::domain::{Part, UploadTarget, VideoDescriptor};

/// パート送信中の進捗通知（そのパートで送信済みのバイト数）
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// `send_part` が返す Future
pub type SendPartFuture<'a> =
    Pin<Box<dyn Future<Output = Result<VideoDescriptor, InfraError>> + Send + 'a>>;

/// 1パート分の送信要求
#[derive(Debug, Clone)]
pub struct PartRequest {
    pub target: UploadTarget,
    /// multipart の filename
    pub file_name: String,
    pub part: Part,
    /// ファイル全体のサイズ（プログレッシブ方式では不明）
    pub total_size: Option<u64>,
    pub data: Vec<u8>,
    pub progressive: bool,
    /// トークン方式で2パート目以降に送る動画ID
    pub video_id: Option<String>,
}

impl PartRequest {
    /// `Content-Range` ヘッダーの値
    ///
    /// - プログレッシブ: `part {n}/*`、最終パートは `part {n}/{n}`
    /// - 通常: `bytes {start}-{end-1}/{total}`（空ファイルでは送らない）
    pub fn content_range(&self) -> Option<String> {
        let number = self.part.number();
        if self.progressive {
            return Some(if self.part.is_last {
                format!("part {}/{}", number, number)
            } else {
                format!("part {}/*", number)
            });
        }

        let total = self.total_size.unwrap_or(self.part.end);
        if self.part.is_empty() || total == 0 {
            return None;
        }
        Some(format!(
            "bytes {}-{}/{}",
            self.part.start,
            self.part.end - 1,
            total
        ))
    }
}

/// リモートアップロードAPI
///
/// 返された Future を drop すると送信中のリクエストは中断される。
pub trait RemoteUploadApi: Send + Sync {
    /// パートを1つ送信し、APIが返した動画の記述子を返す
    fn send_part(&self, request: PartRequest, progress: ProgressFn) -> SendPartFuture<'_>;
}

/// 設定のスナップショットからクライアントを作る
///
/// 操作の開始時に1回だけ呼ばれ、以降の設定変更は実行中の操作に影響しない。
pub trait ApiConnector: Send + Sync {
    fn connect(&self, settings: &UploaderSettings) -> Result<Arc<dyn RemoteUploadApi>, InfraError>;
}

/// HTTP (reqwest) で接続するコネクタ
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl ApiConnector for HttpConnector {
    fn connect(&self, settings: &UploaderSettings) -> Result<Arc<dyn RemoteUploadApi>, InfraError> {
        Ok(Arc::new(ApiClient::from_settings(settings)?))
    }
}
