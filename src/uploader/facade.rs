//! アップロードのファサード
//!
//! ブリッジのコマンドと1対1に対応する公開操作。
//! 設定は操作の開始時にスナップショットを取り、実行中の操作には影響しない。
//! アップロード系の操作はそれぞれ独立したタスクで動き、
//! 結果は操作IDごとの [`OperationHandle`] に順序どおり届く。

use crate::api::remote::{ApiConnector, HttpConnector, RemoteUploadApi};
use crate::config::{ChunkSize, ClientIdentity, Environment, UploaderSettings};
use crate::domain::{SessionId, SessionRegistry, UploadMode, UploadSession, UploadTarget, VideoDescriptor};
use crate::uploader::driver::{self, Stop};
use crate::uploader::error::UploadError;
use crate::uploader::event::{EventSink, OperationHandle, UploadEvent};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

type OperationTable = Arc<Mutex<HashMap<String, EventSink>>>;

/// アップロードのオーケストレーター
pub struct Uploader {
    settings: RwLock<UploaderSettings>,
    registry: Arc<SessionRegistry>,
    connector: Arc<dyn ApiConnector>,
    /// 実行中の操作（操作ID -> 送信側）
    operations: OperationTable,
}

impl Default for Uploader {
    fn default() -> Self {
        Self::new()
    }
}

impl Uploader {
    /// HTTP でリモートAPIに接続するアップローダーを作成
    pub fn new() -> Self {
        Self::with_connector(Arc::new(HttpConnector))
    }

    /// 接続方法を指定して作成（テストではモックを渡す）
    pub fn with_connector(connector: Arc<dyn ApiConnector>) -> Self {
        Self {
            settings: RwLock::new(UploaderSettings::default()),
            registry: Arc::new(SessionRegistry::new()),
            connector,
            operations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 現在の設定のスナップショット
    pub fn settings(&self) -> UploaderSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// 実行中の操作数
    pub fn active_operations(&self) -> usize {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn update_settings<T>(&self, f: impl FnOnce(&mut UploaderSettings) -> T) -> T {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut settings)
    }

    // ------------------------------------------------------------------
    // 設定
    // ------------------------------------------------------------------

    /// SDK名とバージョンを設定（`AV-Origin-Sdk` ヘッダー）
    pub fn set_sdk_name_version(&self, name: &str, version: &str) -> Result<(), UploadError> {
        let identity = ClientIdentity::new("sdk name", name, version)?;
        self.update_settings(|s| s.sdk = Some(identity));
        Ok(())
    }

    /// アプリケーション名とバージョンを設定（`AV-Origin-App` ヘッダー）
    pub fn set_application_name(&self, name: &str, version: &str) -> Result<(), UploadError> {
        let identity = ClientIdentity::new("application name", name, version)?;
        self.update_settings(|s| s.application = Some(identity));
        Ok(())
    }

    /// 接続先の環境を設定
    pub fn set_environment(&self, environment: &str) -> Result<(), UploadError> {
        let environment = Environment::parse(environment)?;
        debug!(environment = %environment.base_url(), "environment updated");
        self.update_settings(|s| s.environment = environment);
        Ok(())
    }

    /// APIキーを設定
    pub fn set_api_key(&self, api_key: impl Into<String>) {
        let api_key = api_key.into();
        self.update_settings(|s| s.api_key = Some(api_key));
    }

    /// チャンクサイズを設定
    ///
    /// # Returns
    /// 有効になったチャンクサイズ
    ///
    /// # Errors
    /// リモートAPIの許容範囲外なら `ConfigError::InvalidChunkSize`（丸めない）
    pub fn set_chunk_size(&self, bytes: u64) -> Result<u64, UploadError> {
        let chunk_size = ChunkSize::new(bytes)?;
        self.update_settings(|s| s.chunk_size = chunk_size);
        Ok(chunk_size.bytes())
    }

    /// リクエストのタイムアウトを秒単位で設定
    pub fn set_timeout(&self, seconds: u64) -> Result<(), UploadError> {
        self.update_settings(|s| s.set_timeout_seconds(seconds))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // アップロード
    // ------------------------------------------------------------------

    /// APIキーで動画IDのソースとしてファイルをアップロード
    ///
    /// tokio ランタイムの中で呼ぶこと。
    pub fn upload(
        &self,
        operation_id: &str,
        video_id: &str,
        file_path: &str,
    ) -> Result<OperationHandle, UploadError> {
        self.start_whole_file(
            operation_id,
            UploadMode::Simple,
            UploadTarget::VideoId(video_id.to_string()),
            file_path,
            None,
        )
    }

    /// アップロードトークンでファイルをアップロード
    ///
    /// `video_id` を渡すと、トークンで作成済みの動画のソースとして送る。
    pub fn upload_with_token(
        &self,
        operation_id: &str,
        token: &str,
        file_path: &str,
        video_id: Option<&str>,
    ) -> Result<OperationHandle, UploadError> {
        self.start_whole_file(
            operation_id,
            UploadMode::TokenAuthorized,
            UploadTarget::Token(token.to_string()),
            file_path,
            video_id,
        )
    }

    fn start_whole_file(
        &self,
        operation_id: &str,
        mode: UploadMode,
        target: UploadTarget,
        file_path: &str,
        video_id: Option<&str>,
    ) -> Result<OperationHandle, UploadError> {
        let (sink, handle) = self.begin_operation(operation_id)?;
        let settings = self.settings();

        // セッションは同期的に登録するので、直後の cancelAll でも必ず見える
        let session = match self
            .registry
            .create(None, mode, target, settings.chunk_size.bytes(), None)
        {
            Ok(session) => session,
            Err(e) => {
                self.end_operation(operation_id);
                return Err(e.into());
            }
        };
        if let Some(video_id) = video_id {
            session.set_remote_video_id(video_id);
        }

        self.spawn_whole_file(operation_id, session, settings, file_path, sink);
        Ok(handle)
    }

    fn spawn_whole_file(
        &self,
        operation_id: &str,
        session: Arc<UploadSession>,
        settings: UploaderSettings,
        file_path: &str,
        sink: EventSink,
    ) {
        info!(
            operation = %operation_id,
            session = %session.id(),
            mode = ?session.mode(),
            file = %file_path,
            "upload started"
        );

        let registry = Arc::clone(&self.registry);
        let session_id = session.id().to_string();
        let file_path = file_path.to_string();
        let connector = Arc::clone(&self.connector);

        self.spawn_operation(operation_id, sink, move |sink| async move {
            let result = match connect(connector.as_ref(), &settings, &session) {
                Ok(api) => driver::run_whole_file(session, api, file_path, sink).await,
                Err(stop) => Err(stop),
            };
            registry.remove(&session_id);
            result
        });
    }

    // ------------------------------------------------------------------
    // プログレッシブ
    // ------------------------------------------------------------------

    /// 動画IDに対するプログレッシブアップロードのセッションを作成
    ///
    /// # Returns
    /// セッションID（動画ID）
    pub fn create_progressive_session(&self, video_id: &str) -> Result<SessionId, UploadError> {
        self.create_progressive(UploadTarget::VideoId(video_id.to_string()))
    }

    /// アップロードトークンに対するプログレッシブアップロードのセッションを作成
    ///
    /// # Returns
    /// セッションID（トークン）
    pub fn create_progressive_session_with_token(&self, token: &str) -> Result<SessionId, UploadError> {
        self.create_progressive(UploadTarget::Token(token.to_string()))
    }

    fn create_progressive(&self, target: UploadTarget) -> Result<SessionId, UploadError> {
        let chunk_size = self.settings().chunk_size.bytes();
        let session = self.registry.create(
            Some(target.key().to_string()),
            UploadMode::Progressive,
            target,
            chunk_size,
            None,
        )?;
        info!(session = %session.id(), "progressive upload session created");
        Ok(session.id().to_string())
    }

    /// プログレッシブセッションにパートを1つ送る
    ///
    /// `target` は作成時の動画IDまたはトークン。`part_index` は再送時に指定する（0始まり）。
    pub fn upload_part(
        &self,
        operation_id: &str,
        target: &UploadTarget,
        file_path: &str,
        part_index: Option<usize>,
    ) -> Result<OperationHandle, UploadError> {
        self.start_part(operation_id, target, file_path, part_index, false)
    }

    /// プログレッシブセッションに最終パートを送り、動画を確定する
    pub fn upload_last_part(
        &self,
        operation_id: &str,
        target: &UploadTarget,
        file_path: &str,
        part_index: Option<usize>,
    ) -> Result<OperationHandle, UploadError> {
        self.start_part(operation_id, target, file_path, part_index, true)
    }

    fn start_part(
        &self,
        operation_id: &str,
        target: &UploadTarget,
        file_path: &str,
        part_index: Option<usize>,
        is_last: bool,
    ) -> Result<OperationHandle, UploadError> {
        // 未作成のセッションは暗黙に作らない
        let session = self.registry.get(target.key())?;
        let (sink, handle) = self.begin_operation(operation_id)?;
        let settings = self.settings();

        debug!(
            operation = %operation_id,
            session = %session.id(),
            is_last,
            "part upload started"
        );

        let file_path = file_path.to_string();
        let connector = Arc::clone(&self.connector);

        self.spawn_operation(operation_id, sink, move |sink| async move {
            let api = connect(connector.as_ref(), &settings, &session)?;
            driver::run_progressive_part(session, api, file_path, part_index, is_last, sink).await
        });
        Ok(handle)
    }

    // ------------------------------------------------------------------
    // キャンセル
    // ------------------------------------------------------------------

    /// 全セッションにキャンセルを要求する
    ///
    /// 以降、実行中の操作には進捗も成功も届かず、`Cancelled` で終わる。
    ///
    /// # Returns
    /// キャンセルを要求したセッション数
    pub fn cancel_all(&self) -> usize {
        let signalled = self.registry.cancel_all();
        for sink in self
            .operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            sink.mute_progress();
        }
        info!(signalled, "cancelled all upload sessions");
        signalled
    }

    // ------------------------------------------------------------------
    // 操作の管理
    // ------------------------------------------------------------------

    fn begin_operation(&self, operation_id: &str) -> Result<(EventSink, OperationHandle), UploadError> {
        let mut operations = self.operations.lock().unwrap_or_else(PoisonError::into_inner);
        if operations.contains_key(operation_id) {
            return Err(UploadError::OperationInProgress {
                operation_id: operation_id.to_string(),
            });
        }
        let (sink, handle) = EventSink::channel(operation_id);
        operations.insert(operation_id.to_string(), sink.clone());
        Ok((sink, handle))
    }

    fn end_operation(&self, operation_id: &str) {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(operation_id);
    }

    /// 操作をタスクとして起動し、結果を終端イベントとして1回だけ送る
    fn spawn_operation<F, Fut>(&self, operation_id: &str, sink: EventSink, run: F)
    where
        F: FnOnce(EventSink) -> Fut,
        Fut: Future<Output = Result<VideoDescriptor, Stop>> + Send + 'static,
    {
        let operations = Arc::clone(&self.operations);
        let operation_id = operation_id.to_string();
        let task = run(sink.clone());

        tokio::spawn(async move {
            let event = match task.await {
                Ok(descriptor) => UploadEvent::Success(descriptor),
                Err(Stop::Cancelled) => UploadEvent::Cancelled,
                Err(Stop::Failed(err)) => UploadEvent::Failed(err),
            };
            debug!(operation = %operation_id, terminal = ?event, "operation finished");

            // 終端イベントの前に表から外し、同じ操作IDをすぐ再利用できるようにする
            operations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&operation_id);
            sink.finish(event);
        });
    }
}

/// 設定のスナップショットでリモートAPIに接続する
fn connect(
    connector: &dyn ApiConnector,
    settings: &UploaderSettings,
    session: &UploadSession,
) -> Result<Arc<dyn RemoteUploadApi>, Stop> {
    connector.connect(settings).map_err(|e| {
        session.fail(e.to_string());
        Stop::Failed(e.into())
    })
}
