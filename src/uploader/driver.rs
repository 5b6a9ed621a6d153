//! セッションの駆動
//!
//! 1つの操作の間、セッションを状態機械に沿って進める。
//! キャンセルはパートの境界（チェックポイント）と、送信中のリクエストの中断で反映する。

use crate::api::error::InfraError;
use crate::api::remote::{PartRequest, ProgressFn, RemoteUploadApi};
use crate::config::APP_CONFIG;
use crate::domain::validator::{self, ValidationResult};
use crate::domain::{DomainError, Part, PartStart, ProgressAggregator, UploadSession, UploadTarget, VideoDescriptor};
use crate::uploader::error::UploadError;
use crate::uploader::event::EventSink;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// 終端の理由（成功以外）
#[derive(Debug)]
pub(crate) enum Stop {
    Cancelled,
    Failed(UploadError),
}

/// 送信中にエラーが起きたときの後始末
///
/// キャンセル要求が出ていればキャンセルとして扱う。
fn abort(session: &UploadSession, err: UploadError) -> Stop {
    if session.checkpoint() {
        return Stop::Cancelled;
    }
    warn!(session = %session.id(), error = %err, "upload session failed");
    session.fail(err.to_string());
    Stop::Failed(err)
}

/// ファイル全体をチャンク計画に沿って順番に送る（Simple / TokenAuthorized）
pub(crate) async fn run_whole_file(
    session: Arc<UploadSession>,
    api: Arc<dyn RemoteUploadApi>,
    file_path: String,
    sink: EventSink,
) -> Result<VideoDescriptor, Stop> {
    if session.checkpoint() {
        return Err(Stop::Cancelled);
    }

    let file = validator::validate_upload_file(&file_path)
        .await
        .map_err(|e| abort(&session, e.into()))?;
    session
        .set_total_size(file.size)
        .map_err(|e| abort(&session, e.into()))?;

    let aggregator = Arc::new(Mutex::new(ProgressAggregator::new(file.size)));
    let mut last_receipt = None;

    for part in session.plan() {
        if session.checkpoint() {
            return Err(Stop::Cancelled);
        }

        let data = validator::read_part(&file.path, &part)
            .await
            .map_err(|e| abort(&session, e.into()))?;

        let receipt = send(&session, api.as_ref(), &file, part, data, false, &aggregator, &sink).await?;
        last_receipt = Some(receipt);
    }

    if session.checkpoint() {
        return Err(Stop::Cancelled);
    }
    let descriptor = last_receipt.unwrap_or_else(|| VideoDescriptor::new(Value::Null));
    finalize(&session, descriptor)
}

/// プログレッシブ方式のパートを1つ送る
///
/// ファイルの検証エラーや順序違反はセッションを変更しない（呼び出し側が直して再送できる）。
/// 送信に失敗した場合だけセッションは `Failed` になる。
pub(crate) async fn run_progressive_part(
    session: Arc<UploadSession>,
    api: Arc<dyn RemoteUploadApi>,
    file_path: String,
    part_index: Option<usize>,
    is_last: bool,
    sink: EventSink,
) -> Result<VideoDescriptor, Stop> {
    if session.checkpoint() {
        return Err(Stop::Cancelled);
    }

    let file = validator::validate_upload_file(&file_path)
        .await
        .map_err(|e| Stop::Failed(e.into()))?;

    // チャンクの上限を超えるパートは読む前に拒否する
    let max = APP_CONFIG.upload.max_chunk_size;
    if file.size > max {
        return Err(Stop::Failed(
            DomainError::PartTooLarge {
                size: file.size,
                max,
            }
            .into(),
        ));
    }

    let part = session
        .progressive_part(part_index, file.size, is_last)
        .map_err(|e| Stop::Failed(e.into()))?;

    // ファイルはこのパートの中身だけなので先頭から読む
    let local = Part::new(part.index, 0, part.len(), part.is_last);
    let data = validator::read_part(&file.path, &local)
        .await
        .map_err(|e| Stop::Failed(e.into()))?;

    let aggregator = Arc::new(Mutex::new(ProgressAggregator::new(part.len())));
    let receipt = send(&session, api.as_ref(), &file, part, data, true, &aggregator, &sink).await?;

    if is_last && !session.is_terminal() {
        if session.checkpoint() {
            return Err(Stop::Cancelled);
        }
        return finalize(&session, receipt);
    }
    if session.checkpoint() {
        return Err(Stop::Cancelled);
    }
    Ok(receipt)
}

/// 1パートを送信して完了を記録する
#[allow(clippy::too_many_arguments)]
async fn send(
    session: &UploadSession,
    api: &dyn RemoteUploadApi,
    file: &ValidationResult,
    part: Part,
    data: Vec<u8>,
    progressive: bool,
    aggregator: &Arc<Mutex<ProgressAggregator>>,
    sink: &EventSink,
) -> Result<VideoDescriptor, Stop> {
    let digest = validator::part_digest(&data);
    match session.begin_part(part, digest) {
        Ok(PartStart::Send) => {}
        Ok(PartStart::AlreadyComplete(receipt)) => {
            debug!(session = %session.id(), part = part.index, "part already uploaded, skipping");
            let mut progress = aggregator.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(percent) = progress.complete_part(part.index, part.len()) {
                sink.progress(percent);
            }
            return Ok(receipt.unwrap_or_else(|| VideoDescriptor::new(Value::Null)));
        }
        // 状態違反は呼び出し側の誤りなのでセッションには触れない
        Err(e) => return Err(Stop::Failed(e.into())),
    }

    aggregator
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .begin_part(part.index, part.len());

    let progress: ProgressFn = {
        let aggregator = Arc::clone(aggregator);
        let sink = sink.clone();
        let index = part.index;
        Arc::new(move |bytes| {
            let percent = aggregator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .update(index, bytes);
            if let Some(percent) = percent {
                sink.progress(percent);
            }
        })
    };

    let request = PartRequest {
        target: session.target().clone(),
        file_name: file.file_name.clone(),
        part,
        total_size: if progressive { None } else { session.total_size() },
        data,
        progressive,
        video_id: match session.target() {
            UploadTarget::Token(_) => session.remote_video_id(),
            UploadTarget::VideoId(_) => None,
        },
    };

    debug!(session = %session.id(), part = part.index, bytes = part.len(), "part transfer started");

    let cancel = session.cancel_token();
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            // 送信中のリクエストは Future の drop で中断される
            session.mark_cancelled();
            return Err(Stop::Cancelled);
        }
        result = api.send_part(request, progress) => result,
    };

    let receipt = result.map_err(|e: InfraError| abort(session, e.into()))?;

    // 応答と同時にキャンセルが来た場合もキャンセルを優先する
    if session.checkpoint() {
        return Err(Stop::Cancelled);
    }

    session
        .complete_part(part.index, Some(receipt.clone()))
        .map_err(|e| abort(session, e.into()))?;

    let percent = aggregator
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .complete_part(part.index, part.len());
    if let Some(percent) = percent {
        sink.progress(percent);
    }

    debug!(session = %session.id(), part = part.index, "part transfer completed");
    Ok(receipt)
}

/// 全パート完了後に確定して成功を記録する
///
/// api.video は最終パートの応答で動画を確定するので、その応答を記述子とする。
fn finalize(session: &UploadSession, descriptor: VideoDescriptor) -> Result<VideoDescriptor, Stop> {
    session
        .begin_finalize()
        .map_err(|e| abort(session, e.into()))?;
    session
        .succeed(descriptor.clone())
        .map_err(|e| abort(session, e.into()))?;
    debug!(session = %session.id(), "upload session succeeded");
    Ok(descriptor)
}
