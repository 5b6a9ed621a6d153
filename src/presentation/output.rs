/// プレゼンテーション層: 出力メッセージの書き出し
///
/// ブリッジの出力（結果・エラー・進捗イベント）を1行1JSONで書き出す。
/// 書き込むのは1つのタスクだけで、どの操作から来たメッセージも
/// 1本のチャネルを通るので行が混ざることはない。
/// stdout はプロトコル専用で、ログは stderr に出す。
use crate::commands::result::OutboundMessage;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 出力チャネルの容量
pub const OUTBOUND_CAPACITY: usize = 256;

/// 出力チャネルを作成
pub fn channel() -> (mpsc::Sender<OutboundMessage>, mpsc::Receiver<OutboundMessage>) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

/// メッセージを1行のJSONに変換
pub fn to_json_line(message: &OutboundMessage) -> io::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(message).map_err(io::Error::other)?;
    line.push(b'\n');
    Ok(line)
}

/// チャネルが閉じるまでメッセージを書き出す
///
/// 全ての送信側が drop されるとチャネルが閉じ、ストリームの終端となる。
pub async fn write_messages<W>(mut writer: W, mut messages: mpsc::Receiver<OutboundMessage>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = messages.recv().await {
        writer.write_all(&to_json_line(&message)?).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

/// 書き出しタスクを起動
pub fn spawn_writer<W>(writer: W, messages: mpsc::Receiver<OutboundMessage>) -> JoinHandle<io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(write_messages(writer, messages))
}
