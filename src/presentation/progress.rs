/// プレゼンテーション層: 操作のイベントを出力メッセージへ変換
///
/// 操作ごとのイベントストリーム（進捗*、終端）を読み、
/// 進捗は `progressChanged` イベント、終端は要求IDへの結果またはエラーとして送る。
///
/// # 設計方針
/// - 1つの操作につき終端メッセージはちょうど1つ
/// - ストリームが終端イベントなしで閉じた場合もエラーを1つ返す
use crate::commands::result::{BridgeError, OutboundMessage};
use crate::uploader::{OperationHandle, UploadEvent};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// イベントを出力メッセージに変換
///
/// # Arguments
/// * `event` - 操作のイベント
/// * `upload_id` - 操作ID（進捗イベントの `uploadId`）
/// * `request_id` - 終端メッセージを対応付ける要求ID
pub fn to_message(event: UploadEvent, upload_id: &str, request_id: &Value) -> OutboundMessage {
    match event {
        UploadEvent::Progress(progress) => OutboundMessage::ProgressChanged {
            upload_id: upload_id.to_string(),
            progress,
        },
        UploadEvent::Success(video) => OutboundMessage::reply(request_id.clone(), Ok(video.into_value())),
        UploadEvent::Cancelled => OutboundMessage::reply(request_id.clone(), Err(BridgeError::cancelled())),
        UploadEvent::Failed(err) => {
            OutboundMessage::reply(request_id.clone(), Err(BridgeError::from(&err)))
        }
    }
}

/// 操作のイベントストリームを出力チャネルへ転送する
///
/// 出力チャネルが閉じていたら（呼び出し側が切断）転送をやめる。
pub async fn forward(mut handle: OperationHandle, request_id: Value, outbound: mpsc::Sender<OutboundMessage>) {
    let upload_id = handle.operation_id.clone();

    while let Some(event) = handle.recv().await {
        let terminal = event.is_terminal();
        if outbound
            .send(to_message(event, &upload_id, &request_id))
            .await
            .is_err()
        {
            debug!(operation = %upload_id, "output closed, stop forwarding");
            return;
        }
        if terminal {
            return;
        }
    }

    warn!(operation = %upload_id, "operation ended without a result");
    let _ = outbound
        .send(OutboundMessage::reply(
            request_id,
            Err(BridgeError::new(
                "operation_aborted",
                "The upload operation ended unexpectedly",
                None,
            )),
        ))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VideoDescriptor;
    use crate::uploader::EventSink;
    use serde_json::json;

    #[tokio::test]
    async fn test_forward_progress_then_result() {
        let (sink, handle) = EventSink::channel("op1");
        let (tx, mut rx) = mpsc::channel(16);

        sink.progress(50);
        sink.progress(100);
        sink.finish(UploadEvent::Success(VideoDescriptor::new(json!({"videoId": "vi1"}))));

        forward(handle, json!(9), tx).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            OutboundMessage::ProgressChanged {
                upload_id: "op1".into(),
                progress: 50
            }
        );
        assert!(matches!(
            rx.recv().await.unwrap(),
            OutboundMessage::ProgressChanged { progress: 100, .. }
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            OutboundMessage::Result {
                id: json!(9),
                value: json!({"videoId": "vi1"})
            }
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_forward_cancelled() {
        let (sink, handle) = EventSink::channel("op1");
        let (tx, mut rx) = mpsc::channel(16);
        sink.finish(UploadEvent::Cancelled);

        forward(handle, json!("r"), tx).await;

        match rx.recv().await.unwrap() {
            OutboundMessage::Error { id, error } => {
                assert_eq!(id, json!("r"));
                assert_eq!(error.code, "upload_cancelled");
                assert_eq!(error.message, "Upload was cancelled");
            }
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forward_stream_closed_without_result() {
        let (sink, handle) = EventSink::channel("op1");
        let (tx, mut rx) = mpsc::channel(16);
        drop(sink);

        forward(handle, json!(1), tx).await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            OutboundMessage::Error { ref error, .. } if error.code == "operation_aborted"
        ));
    }
}
