use crate::commands::Bridge;
use crate::presentation::output;
use crate::uploader::Uploader;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};
use tracing::info;

/// 標準入出力でブリッジを動かす
///
/// stdin から1行1要求を読み、stdout に1行1メッセージを書き出す。
pub async fn run() -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    serve(Arc::new(Uploader::new()), input, tokio::io::stdout()).await
}

/// 入力が閉じるまで要求を処理する
///
/// 入力の終端は呼び出し側が聞くのをやめたことを意味する。
/// 実行中の操作をキャンセルし、残りの出力を書き出してからストリームを閉じる。
///
/// # エラー
/// 入力の読み込み・出力の書き込みに失敗した場合
pub async fn serve<R, W>(uploader: Arc<Uploader>, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = output::channel();
    let writer = output::spawn_writer(output, rx);
    let bridge = Bridge::new(uploader, tx);

    info!("bridge ready");

    let mut lines = input.lines();
    let read_result = loop {
        match lines.next_line().await {
            Ok(Some(line)) => bridge.handle_line(&line).await,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    info!("input closed, cancelling in-flight uploads");
    bridge.shutdown().await;

    // 最後の送信側を drop して出力ストリームを閉じる
    drop(bridge);
    writer
        .await
        .context("Output writer task failed")?
        .context("Failed to write bridge output")?;

    read_result.context("Failed to read bridge input")
}
