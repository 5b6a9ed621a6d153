//! アップロード系コマンド（ファイル全体を1回の操作で送る）
//!
//! 成功すると操作のイベントストリームを返し、結果は非同期に届く。
//! 引数は上から順に検証し、最初に欠けていたもののコードを返す。
//! セッションの作業は検証が通るまで始めない。

use crate::commands::request::Arguments;
use crate::uploader::{OperationHandle, UploadError, Uploader};

/// upload: `videoId`, `filePath`, `uploadId`
pub fn upload(uploader: &Uploader, args: &Arguments) -> Result<OperationHandle, UploadError> {
    let video_id = args.require_string("videoId", "missing_video_id", "videoId is missing")?;
    let file_path = args.require_string("filePath", "missing_file_path", "File path is missing")?;
    let upload_id =
        args.require_string("uploadId", "missing_operation_id", "Operation id is missing")?;

    uploader.upload(upload_id, video_id, file_path)
}

/// uploadWithUploadToken: `token`, `filePath`, `uploadId`（`videoId` は任意）
pub fn upload_with_token(
    uploader: &Uploader,
    args: &Arguments,
) -> Result<OperationHandle, UploadError> {
    let token = args.require_string("token", "missing_token", "token is missing")?;
    let file_path = args.require_string("filePath", "missing_file_path", "File path is missing")?;
    let upload_id =
        args.require_string("uploadId", "missing_operation_id", "Operation id is missing")?;

    uploader.upload_with_token(upload_id, token, file_path, args.string("videoId"))
}
