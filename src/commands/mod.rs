//! ブリッジのコマンド
//!
//! 1要求を対応するコマンドに振り分け、結果を出力チャネルへ送る。
//! アップロード系のコマンドは操作を起動して即座に戻り、
//! 結果は転送タスクが後から送る。

pub mod cancel;
pub mod progressive;
pub mod request;
pub mod result;
pub mod settings;
pub mod upload;

use crate::presentation::progress;
use crate::uploader::{OperationHandle, UploadError, Uploader};
use request::BridgeRequest;
use result::{BridgeError, OutboundMessage};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub use result::{CANCELLED_CODE, CANCELLED_MESSAGE};

/// コマンドの振り分け
pub struct Bridge {
    uploader: Arc<Uploader>,
    outbound: mpsc::Sender<OutboundMessage>,
    /// 実行中の操作のイベント転送タスク
    forwarders: Mutex<JoinSet<()>>,
}

impl Bridge {
    pub fn new(uploader: Arc<Uploader>, outbound: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            uploader,
            outbound,
            forwarders: Mutex::new(JoinSet::new()),
        }
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    fn forwarders(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.forwarders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 入力の1行を処理する
    pub async fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match BridgeRequest::parse(line) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!(error = %e, "invalid bridge request");
                self.send(OutboundMessage::reply(
                    Value::Null,
                    Err(BridgeError::invalid_request(e.to_string())),
                ))
                .await;
            }
        }
    }

    /// 要求を対応するコマンドに振り分ける
    pub async fn dispatch(&self, request: BridgeRequest) {
        let BridgeRequest {
            id,
            method,
            arguments: args,
        } = request;
        debug!(method = %method, "bridge request");

        let uploader = self.uploader.as_ref();
        let reply = match method.as_str() {
            "setSdkNameVersion" => settings::set_sdk_name_version(uploader, &args),
            "setApplicationName" => settings::set_application_name(uploader, &args),
            "setEnvironment" => settings::set_environment(uploader, &args),
            "setApiKey" => settings::set_api_key(uploader, &args),
            "setChunkSize" => settings::set_chunk_size(uploader, &args),
            "setTimeout" => settings::set_timeout(uploader, &args),
            "uploadWithUploadToken" => {
                return self.start(id, upload::upload_with_token(uploader, &args)).await;
            }
            "upload" => return self.start(id, upload::upload(uploader, &args)).await,
            "createProgressiveUploadSession" => progressive::create_session(uploader, &args),
            "createProgressiveUploadWithUploadTokenSession" => {
                progressive::create_session_with_token(uploader, &args)
            }
            "uploadPart" => {
                return self
                    .start(id, progressive::upload_part(uploader, &args, false))
                    .await;
            }
            "uploadLastPart" => {
                return self
                    .start(id, progressive::upload_part(uploader, &args, true))
                    .await;
            }
            "cancelAll" => cancel::execute(uploader),
            _ => Err(BridgeError::not_implemented(&method)),
        };

        self.send(OutboundMessage::reply(id, reply)).await;
    }

    /// 起動した操作のイベント転送を始める（起動に失敗したら即座にエラーを返す）
    async fn start(&self, id: Value, started: Result<OperationHandle, UploadError>) {
        match started {
            Ok(handle) => {
                let outbound = self.outbound.clone();
                let mut forwarders = self.forwarders();
                // 終わった転送タスクを回収する
                while forwarders.try_join_next().is_some() {}
                forwarders.spawn(progress::forward(handle, id, outbound));
            }
            Err(e) => {
                debug!(error = %e, "operation rejected");
                self.send(OutboundMessage::reply(id, Err(BridgeError::from(&e))))
                    .await;
            }
        }
    }

    async fn send(&self, message: OutboundMessage) {
        if self.outbound.send(message).await.is_err() {
            warn!("output channel closed, dropping message");
        }
    }

    /// 呼び出し側が切断したときの後始末
    ///
    /// 実行中の操作をすべてキャンセルし、各操作の終端メッセージが
    /// 出力チャネルに送られるまで待つ。
    pub async fn shutdown(&self) {
        let cancelled = self.uploader.cancel_all();
        debug!(cancelled, "bridge shutting down");

        let mut forwarders = std::mem::take(&mut *self.forwarders());
        while forwarders.join_next().await.is_some() {}
    }
}
