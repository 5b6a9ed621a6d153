//! 結合テスト用のモック
//!
//! `RemoteUploadApi` のモックと、それを返すコネクタ。
//! 送信されたパートと、接続時の設定スナップショットを記録する。

#![allow(dead_code)]

use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use vidup::api::error::InfraError;
use vidup::api::remote::{ApiConnector, PartRequest, ProgressFn, RemoteUploadApi, SendPartFuture};
use vidup::config::UploaderSettings;
use vidup::domain::{UploadTarget, VideoDescriptor};
use vidup::uploader::Uploader;

/// モックの応答
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 進捗を報告して成功する
    Succeed,
    /// 指定のステータスで失敗する
    Fail(u16),
    /// 進捗を半分報告したまま応答しない（キャンセル待ち）
    Hang,
}

/// 記録したパート
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPart {
    pub target: UploadTarget,
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub is_last: bool,
    pub len: usize,
    pub content_range: Option<String>,
    pub video_id: Option<String>,
}

type SendHook = Arc<dyn Fn() + Send + Sync>;

pub struct MockApi {
    mode: Mutex<Mode>,
    calls: Mutex<Vec<RecordedPart>>,
    /// 送信の途中（応答の直前）に呼ぶ処理
    hook: Mutex<Option<SendHook>>,
    /// パートの送信が始まるたびに通知
    pub started: Notify,
}

impl MockApi {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode: Mutex::new(mode),
            calls: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
            started: Notify::new(),
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// 送信中に実行する処理を設定
    pub fn on_send(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn calls(&self) -> Vec<RecordedPart> {
        self.calls.lock().unwrap().clone()
    }
}

impl RemoteUploadApi for MockApi {
    fn send_part(&self, request: PartRequest, progress: ProgressFn) -> SendPartFuture<'_> {
        let mode = *self.mode.lock().unwrap();
        let hook = self.hook.lock().unwrap().clone();
        self.calls.lock().unwrap().push(RecordedPart {
            target: request.target.clone(),
            index: request.part.index,
            start: request.part.start,
            end: request.part.end,
            is_last: request.part.is_last,
            len: request.data.len(),
            content_range: request.content_range(),
            video_id: request.video_id.clone(),
        });

        Box::pin(async move {
            self.started.notify_one();
            let len = request.data.len() as u64;
            if let Some(hook) = hook {
                hook();
            }

            match mode {
                Mode::Succeed => {
                    progress(len / 2);
                    progress(len);
                    let video_id = match &request.target {
                        UploadTarget::VideoId(id) => id.clone(),
                        UploadTarget::Token(_) => request
                            .video_id
                            .clone()
                            .unwrap_or_else(|| "vi-token".to_string()),
                    };
                    Ok(VideoDescriptor::new(json!({
                        "videoId": video_id,
                        "part": request.part.number(),
                    })))
                }
                Mode::Fail(status) => Err(InfraError::api(
                    "/mock",
                    "Mock failure",
                    Some(status),
                    Some(format!("{{\"status\":{}}}", status)),
                )),
                Mode::Hang => {
                    progress(len / 2);
                    std::future::pending::<Result<VideoDescriptor, InfraError>>().await
                }
            }
        })
    }
}

/// 常に同じモックを返すコネクタ
pub struct MockConnector {
    pub api: Arc<MockApi>,
    snapshots: Mutex<Vec<UploaderSettings>>,
}

impl MockConnector {
    pub fn snapshots(&self) -> Vec<UploaderSettings> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl ApiConnector for MockConnector {
    fn connect(&self, settings: &UploaderSettings) -> Result<Arc<dyn RemoteUploadApi>, InfraError> {
        self.snapshots.lock().unwrap().push(settings.clone());
        Ok(self.api.clone())
    }
}

/// モックに接続するアップローダーを作成
pub fn mock_uploader(mode: Mode) -> (Arc<Uploader>, Arc<MockConnector>) {
    let connector = Arc::new(MockConnector {
        api: Arc::new(MockApi::new(mode)),
        snapshots: Mutex::new(Vec::new()),
    });
    let uploader = Arc::new(Uploader::with_connector(connector.clone()));
    (uploader, connector)
}

/// 指定サイズのファイルを作成（中身はゼロ）
pub fn sized_file(dir: &Path, name: &str, size: u64) -> String {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(size).unwrap();
    path.to_string_lossy().into_owned()
}

/// 指定内容のファイルを作成
pub fn file_with(dir: &Path, name: &str, data: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path.to_string_lossy().into_owned()
}
