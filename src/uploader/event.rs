//! 操作ごとのイベントストリーム
//!
//! 1つの操作（upload / uploadPart など）の結果は
//! `Progress*` の後に終端イベント（`Success` / `Cancelled` / `Failed`）が
//! ちょうど1つ届く順序付きストリームとして配送される。
//! 終端イベントを送った時点でチャネルは閉じる。

use crate::domain::VideoDescriptor;
use crate::uploader::error::UploadError;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// 操作のイベント
#[derive(Debug)]
pub enum UploadEvent {
    /// ファイル全体（プログレッシブではパート）に対する進捗 (0〜100)
    Progress(u8),
    Success(VideoDescriptor),
    Cancelled,
    Failed(UploadError),
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

struct SinkState {
    tx: Option<mpsc::UnboundedSender<UploadEvent>>,
    mute_progress: bool,
}

/// 送信側
///
/// トランスポートの進捗コールバック（別スレッドの場合がある）と
/// 駆動タスクの両方から使われる。送信はロックの中で行うので、
/// 終端イベントの後に進捗が届くことはない。
#[derive(Clone)]
pub struct EventSink {
    state: Arc<Mutex<SinkState>>,
}

impl EventSink {
    /// 新しいストリームを作成
    pub fn channel(operation_id: impl Into<String>) -> (Self, OperationHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            state: Arc::new(Mutex::new(SinkState {
                tx: Some(tx),
                mute_progress: false,
            })),
        };
        let handle = OperationHandle {
            operation_id: operation_id.into(),
            events: rx,
        };
        (sink, handle)
    }

    /// 進捗を送る（終端後・ミュート後は捨てる）
    pub fn progress(&self, percent: u8) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.mute_progress {
            return;
        }
        if let Some(tx) = &state.tx {
            let _ = tx.send(UploadEvent::Progress(percent));
        }
    }

    /// 以降の進捗を捨てる（キャンセル要求後）
    pub fn mute_progress(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .mute_progress = true;
    }

    /// 終端イベントを送ってチャネルを閉じる
    ///
    /// # Returns
    /// 送った場合 true（既に終端イベントを送っていれば false）
    pub fn finish(&self, event: UploadEvent) -> bool {
        debug_assert!(event.is_terminal());
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.tx.take() {
            Some(tx) => {
                // 受信側が既に閉じていても終端扱いにする
                let _ = tx.send(event);
                true
            }
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tx
            .is_none()
    }
}

/// 受信側: 操作IDとイベントストリーム
#[derive(Debug)]
pub struct OperationHandle {
    pub operation_id: String,
    events: mpsc::UnboundedReceiver<UploadEvent>,
}

impl OperationHandle {
    /// 次のイベントを待つ（終端イベントの後は None）
    pub async fn recv(&mut self) -> Option<UploadEvent> {
        self.events.recv().await
    }

    /// 終端イベントまで読み進める
    ///
    /// # Returns
    /// 受け取った進捗の列と終端イベント
    pub async fn outcome(mut self) -> (Vec<u8>, Option<UploadEvent>) {
        let mut progress = Vec::new();
        while let Some(event) = self.recv().await {
            match event {
                UploadEvent::Progress(percent) => progress.push(percent),
                terminal => return (progress, Some(terminal)),
            }
        }
        (progress, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_progress_then_single_terminal() {
        let (sink, handle) = EventSink::channel("op1");
        sink.progress(10);
        sink.progress(50);
        assert!(sink.finish(UploadEvent::Success(VideoDescriptor::new(json!({"videoId": "v1"})))));

        // 終端後の送信は捨てられる
        assert!(!sink.finish(UploadEvent::Cancelled));
        sink.progress(99);
        assert!(sink.is_finished());

        let (progress, terminal) = handle.outcome().await;
        assert_eq!(progress, vec![10, 50]);
        assert!(matches!(terminal, Some(UploadEvent::Success(_))));
    }

    #[tokio::test]
    async fn test_muted_progress_is_dropped() {
        let (sink, mut handle) = EventSink::channel("op1");
        sink.progress(1);
        sink.mute_progress();
        sink.progress(2);
        sink.finish(UploadEvent::Cancelled);

        assert!(matches!(handle.recv().await, Some(UploadEvent::Progress(1))));
        assert!(matches!(handle.recv().await, Some(UploadEvent::Cancelled)));
        assert!(handle.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_sink_closes_stream() {
        let (sink, handle) = EventSink::channel("op1");
        drop(sink);
        let (progress, terminal) = handle.outcome().await;
        assert!(progress.is_empty());
        assert!(terminal.is_none());
    }
}
