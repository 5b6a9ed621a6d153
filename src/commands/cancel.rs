use crate::commands::result::BridgeError;
use crate::uploader::Uploader;
use serde_json::Value;

/// cancelAll コマンドを実行する
///
/// 全セッションにキャンセルを要求する。実行中の操作はそれぞれ
/// `upload_cancelled` のエラーで終わる。
///
/// # 戻り値
/// null
pub fn execute(uploader: &Uploader) -> Result<Value, BridgeError> {
    uploader.cancel_all();
    Ok(Value::Null)
}
